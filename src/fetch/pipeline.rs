// src/fetch/pipeline.rs
// =============================================================================
// The fetch pipeline: list the tree once, pick the files under the subfolder,
// then download and write every file with at most MAX_CONCURRENT_FETCHES
// tasks in flight.
//
// How it works:
// 1. list_tree() - a failure here ends the whole run
// 2. select_files() - nothing selected means nothing to do (not an error)
// 3. spawn one task per file; each task holds a semaphore permit while it
//    fetches and writes, so the permit is released however the task ends
// 4. join every task, then close the progress bar
//
// A failing file is logged and counted, and never stops its siblings.
// =============================================================================

use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::filter::select_files;
use super::progress::{FetchSummary, Progress};
use super::target::FetchTarget;
use crate::github::{RemoteError, RemoteSource};

/// Upper bound on simultaneous fetch+write tasks.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// Why a single file could not be mirrored.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("refusing to write '{0}' outside the destination directory")]
    UnsafePath(String),

    #[error("error creating directory {}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error writing to file {}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The listing had no blob under the subfolder
    NoMatches,
    Completed(FetchSummary),
}

pub struct Fetcher<S> {
    source: Arc<S>,
    target: Arc<FetchTarget>,
    show_progress: bool,
}

impl<S: RemoteSource + 'static> Fetcher<S> {
    pub fn new(source: Arc<S>, target: FetchTarget) -> Self {
        Self {
            source,
            target: Arc::new(target),
            show_progress: true,
        }
    }

    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn run(&self) -> Result<FetchOutcome, RemoteError> {
        let target = &self.target;

        // Step 1: the full tree listing. Without it there is nothing to do,
        // so its error is returned to the caller
        let entries = self
            .source
            .list_tree(&target.repository, &target.branch)
            .await?;
        debug!(entries = entries.len(), "tree listing received");

        // Step 2: keep blobs under the subfolder. From here on `files` is fixed
        let files = select_files(entries, &target.subfolder);
        if files.is_empty() {
            return Ok(FetchOutcome::NoMatches);
        }

        info!(
            files = files.len(),
            subfolder = %target.subfolder,
            destination = %target.destination.display(),
            "downloading"
        );

        // Step 3: counter sized to the selection, then the permits
        let progress = Progress::start(files.len() as u64, self.show_progress);
        let slots = Arc::new(Semaphore::new(MAX_CONCURRENT_FETCHES));
        let mut tasks = JoinSet::new();

        // Step 4: one task per file. Each task gets its own handles to the
        // shared pieces (Arc clones are cheap)
        for path in files {
            let source = Arc::clone(&self.source);
            let target = Arc::clone(&self.target);
            let slots = Arc::clone(&slots);
            let progress = progress.clone();

            tasks.spawn(async move {
                // Held until this task returns
                let _slot = match slots.acquire_owned().await {
                    Ok(slot) => slot,
                    Err(err) => {
                        progress.fail();
                        progress.suspend(|| error!(path = %path, "no download slot: {}", err));
                        return;
                    }
                };

                // Fetch and write; any error stays inside this task
                match fetch_file(source.as_ref(), &target, &path).await {
                    Ok(written) => {
                        debug!(path = %path, file = %written.display(), "saved");
                        progress.complete();
                    }
                    Err(err) => {
                        progress.fail();
                        let err = anyhow::Error::from(err);
                        progress.suspend(|| warn!(path = %path, "{:#}", err));
                    }
                }
            });
        }

        // Step 5: wait for every task. A panic counts as a failed file
        while let Some(joined) = tasks.join_next().await {
            if let Err(err) = joined {
                progress.fail();
                progress.suspend(|| error!("download task aborted: {}", err));
            }
        }

        // Step 6: only after the join is the bar closed and the summary taken
        Ok(FetchOutcome::Completed(progress.finish()))
    }
}

// Downloads one file and writes it under the destination root
async fn fetch_file<S: RemoteSource + ?Sized>(
    source: &S,
    target: &FetchTarget,
    path: &str,
) -> Result<PathBuf, FetchError> {
    let content = source
        .get_file_content(&target.repository, &target.branch, path)
        .await?;
    save_file(&target.destination, path, &content).await
}

async fn save_file(root: &Path, path: &str, content: &[u8]) -> Result<PathBuf, FetchError> {
    let full_path = destination_path(root, path)?;

    // Parents first; create_dir_all is fine with directories that exist
    if let Some(dir) = full_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| FetchError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    // Overwrites whatever was there from an earlier run
    tokio::fs::write(&full_path, content)
        .await
        .map_err(|source| FetchError::Write {
            path: full_path.clone(),
            source,
        })?;

    Ok(full_path)
}

// Joins a repository path onto the root. Only plain segments are accepted.
fn destination_path(root: &Path, path: &str) -> Result<PathBuf, FetchError> {
    let relative = Path::new(path);
    let plain = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if path.is_empty() || !plain {
        return Err(FetchError::UnsafePath(path.to_string()));
    }

    Ok(root.join(relative))
}
