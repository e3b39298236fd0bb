// src/fetch/target.rs
// =============================================================================
// The Fetch Target: everything one run needs, built once from the command
// line and never changed afterwards.
// =============================================================================

use std::path::PathBuf;

use crate::github::{ClientConfig, RepoLocation};

#[derive(Debug, Clone)]
pub struct FetchTarget {
    /// "owner/name"
    pub repository: String,
    pub branch: String,
    /// Plain string prefix that selects which tree paths are downloaded
    pub subfolder: String,
    /// Local root; files land at `destination/<repository path>`
    pub destination: PathBuf,
    pub verify_tls: bool,
    pub auth_token: Option<String>,
}

impl FetchTarget {
    pub fn new(
        location: RepoLocation,
        destination: impl Into<PathBuf>,
        verify_tls: bool,
        auth_token: Option<String>,
    ) -> Self {
        Self {
            repository: location.repository,
            branch: location.branch,
            subfolder: location.subfolder,
            destination: destination.into(),
            verify_tls,
            auth_token,
        }
    }

    // HTTP settings for the client that serves this target
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            verify_tls: self.verify_tls,
            token: self.auth_token.clone(),
            ..ClientConfig::default()
        }
    }
}
