// src/fetch/mod.rs
// =============================================================================
// This module turns a Fetch Target into a populated destination directory.
//
// Submodules:
// - target: the immutable description of one run
// - filter: which tree entries get downloaded
// - progress: the shared counter and progress bar
// - pipeline: bounded concurrent download-and-write
// =============================================================================

mod filter;
mod pipeline;
mod progress;
mod target;

pub use pipeline::{FetchOutcome, Fetcher};
pub use target::FetchTarget;
