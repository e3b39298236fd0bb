// src/fetch/progress.rs
// =============================================================================
// The shared Progress Counter and the terminal bar that displays it.
//
// Many download tasks update the counter at the same time, so the counts are
// atomics behind an Arc and every clone of Progress sees the same numbers.
// The indicatif bar is only a view of `completed`.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{spinner:.blue} {prefix:>12.cyan.bold} [{elapsed_precise}] {wide_bar:.cyan/blue} {pos}/{len} ({eta})";

const TICK: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

const BAR_CHARS: &str = "█▓▒░  ";

/// Final counts of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
}

impl FetchSummary {
    pub fn is_complete(&self) -> bool {
        self.completed == self.total
    }
}

#[derive(Debug, Default)]
struct Counter {
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Clone)]
pub struct Progress {
    total: u64,
    counter: Arc<Counter>,
    bar: ProgressBar,
}

impl Progress {
    /// Starts the display; `visible = false` keeps the counter but draws nothing.
    pub fn start(total: u64, visible: bool) -> Self {
        let target = if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        };
        let bar = ProgressBar::with_draw_target(Some(total), target);

        // A bad template only costs us the styling
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.tick_chars(TICK).progress_chars(BAR_CHARS));
        }
        bar.set_prefix("Downloading");

        Self {
            total,
            counter: Arc::new(Counter::default()),
            bar,
        }
    }

    /// One file written
    pub fn complete(&self) {
        self.counter.completed.fetch_add(1, Ordering::SeqCst);
        self.bar.inc(1);
    }

    /// One file given up on
    pub fn fail(&self) {
        self.counter.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn completed(&self) -> u64 {
        self.counter.completed.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.counter.failed.load(Ordering::SeqCst)
    }

    // Runs `f` with the bar hidden so log lines don't tear it
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn finish(&self) -> FetchSummary {
        let summary = FetchSummary {
            total: self.total,
            completed: self.completed(),
            failed: self.failed(),
        };

        if summary.failed > 0 {
            self.bar.abandon_with_message(format!("{} failed", summary.failed));
        } else {
            self.bar.finish();
        }

        summary
    }
}
