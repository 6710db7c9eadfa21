/// # qiniu-publish CLI Interface (Module)
///
/// Command parsing and the async entrypoint for the `qiniu-publish` binary.
///
/// All pipeline logic (enumeration, hashing, remote-state resolution, upload and CDN refresh) lives
/// in [`qiniu_publish_core`]. This module only loads the config, wires the Qiniu client into the
/// pipeline and turns the outcome into an exit status.
///
/// ## How To Use
/// - For command-line users: run `qiniu-publish publish` in the project root, or see `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
use crate::console::ConsoleReporter;
use crate::load_config::load_config;
use crate::qiniu::QiniuClient;
use anyhow::Result;
use clap::{Parser, Subcommand};
use qiniu_publish_core::config::PublishOptions;
use qiniu_publish_core::publish::publish_all;
use std::path::PathBuf;

/// CLI for qiniu-publish: incremental publishing of local folders to Qiniu buckets.
#[derive(Parser)]
#[clap(
    name = "qiniu-publish",
    version,
    about = "Upload changed files to Qiniu object storage and refresh their CDN caches"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Publish every bucket task listed under `publishToQiniu` in the config file
    Publish {
        /// Path to the config file (package.json or YAML)
        #[clap(long, default_value = "package.json")]
        config: PathBuf,
        /// Skip the CDN refresh step
        #[clap(long)]
        no_refresh: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Publish { config, no_refresh } => {
            let tasks = load_config(&config)?;
            let options = PublishOptions {
                refresh: !no_refresh,
            };
            tracing::info!(
                command = "publish",
                tasks = tasks.len(),
                refresh = options.refresh,
                "Starting publish"
            );

            let result = publish_all(&tasks, &options, &ConsoleReporter, |task| {
                let client = QiniuClient::new(task.credentials.clone());
                (client.clone(), client)
            })
            .await;

            match result {
                Ok(reports) => {
                    println!("All bucket tasks succeeded");
                    tracing::info!(command = "publish", buckets = reports.len(), "Publish complete");
                    Ok(())
                }
                Err(e) => {
                    println!("Bucket tasks failed");
                    println!("{}: {}", e.source.label(), e.source);
                    tracing::error!(command = "publish", bucket = %e.bucket, error = %e, "Publish failed");
                    Err(anyhow::Error::new(e))
                }
            }
        }
    }
}
