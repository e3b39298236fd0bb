// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) on stderr
// 3. Turn the URL into a Fetch Target and build the GitHub client
// 4. Run the fetch pipeline and print a summary
// 5. Exit with proper code (0 = success, 1 = error)
//
// Failing to download a single file is NOT an error here: it is logged and
// counted, and the run still exits 0.
// =============================================================================

mod cli;
mod fetch;
mod github;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use fetch::{FetchOutcome, FetchTarget, Fetcher};
use github::GithubClient;

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            // {:#} prints the whole cause chain on one line
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<()> {
    // Parse command-line arguments (handles --help, --version and missing inputs)
    let cli = Cli::parse();
    init_logging(cli.verbose);

    println!("subgit - Version: {}", env!("CARGO_PKG_VERSION"));

    // Split the URL into repository / branch / subfolder; a bad URL is fatal
    let location = github::parse_tree_url(&cli.url).context("resolving the GitHub URL")?;
    let target = FetchTarget::new(
        location,
        cli.root_dir,
        !cli.no_verify_ssl,
        cli.pat_token,
    );

    // Insecure mode gets a console line on top of the WARN log
    if !target.verify_tls {
        println!("⚠️  SSL certificate verification is disabled (--no-verify-ssl)");
    }

    let client =
        GithubClient::new(target.client_config()).context("setting up the HTTP client")?;

    println!(
        "🔍 Fetching '{}' from {} ({})",
        display_subfolder(&target.subfolder),
        target.repository,
        target.branch
    );

    // Only a failed tree listing comes back as an error; per-file failures
    // are already logged and show up in the summary
    let fetcher = Fetcher::new(Arc::new(client), target.clone()).show_progress(!cli.quiet);
    let outcome = fetcher
        .run()
        .await
        .context("listing the repository tree")?;

    match outcome {
        FetchOutcome::NoMatches => {
            println!("No files found matching the criteria.");
        }
        FetchOutcome::Completed(summary) => {
            if !summary.is_complete() {
                println!(
                    "⚠️  {} of {} file(s) could not be downloaded",
                    summary.failed, summary.total
                );
            }
            println!(
                "✅ Files downloaded successfully! {}/{} saved to {}",
                summary.completed,
                summary.total,
                target.destination.display()
            );
        }
    }

    Ok(())
}

// RUST_LOG wins when set; --verbose turns on this crate's debug output
fn init_logging(verbose: bool) {
    let default = if verbose {
        concat!("warn,", env!("CARGO_CRATE_NAME"), "=debug")
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn display_subfolder(subfolder: &str) -> &str {
    if subfolder.is_empty() {
        "/"
    } else {
        subfolder
    }
}
