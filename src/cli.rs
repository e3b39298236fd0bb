// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
//   subgit <URL> <ROOT_DIR> [--no-verify-ssl] [--pat-token <TOKEN>] [--quiet] [--verbose]
//
// The token can also come from the GITHUB_TOKEN environment variable.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "subgit",
    version,
    about = "Download a single subdirectory of a GitHub repository",
    long_about = "subgit lists a GitHub repository's tree, picks every file under the folder \
                  the URL points at, and downloads them in parallel into a local directory."
)]
pub struct Cli {
    /// GitHub URL to the subdirectory
    ///
    /// Example: https://github.com/user/repo/tree/branch/subfolder
    pub url: String,

    /// Local directory to save the files (created if missing)
    pub root_dir: PathBuf,

    /// Disable SSL certificate verification (not recommended)
    #[arg(long)]
    pub no_verify_ssl: bool,

    /// GitHub Personal Access Token (PAT) for private repos and higher rate limits
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub pat_token: Option<String>,

    /// Hide the progress bar
    #[arg(long, short)]
    pub quiet: bool,

    /// Log every request and saved file
    #[arg(long, short)]
    pub verbose: bool,
}
