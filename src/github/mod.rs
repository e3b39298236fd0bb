// src/github/mod.rs
// =============================================================================
// Everything that knows about GitHub:
// - location: decomposing a folder URL into repository / branch / subfolder
// - client: the HTTP client for the Git Trees API and raw file contents
// =============================================================================

mod client;
mod location;

pub use client::{
    ClientConfig, EntryKind, GithubClient, RemoteError, RemoteSource, TreeEntry,
};
pub use location::{parse_tree_url, RepoLocation};
