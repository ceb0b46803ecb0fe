//! Command-line interface for the pallet package registry.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{App, read_input, report};
use pallet_registry::RequestContext;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "palletctl")]
#[command(about = "Command-line interface for the pallet package registry")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, env = "PALLET_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Default)]
struct PagingArgs {
    /// Index of the first item to return
    #[arg(long, allow_hyphen_values = true)]
    start: Option<String>,

    /// Maximum number of items to return (0 or negative: no limit)
    #[arg(long, allow_hyphen_values = true)]
    limit: Option<String>,
}

#[derive(Args, Clone)]
struct VersionArgs {
    space: String,
    package: String,
    version: String,
}

impl VersionArgs {
    fn request(&self) -> RequestContext {
        RequestContext::new(&self.space)
            .with_package(&self.package)
            .with_version(&self.version)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Store a package archive as the version it declares
    Push {
        space: String,
        /// Path to the .pkg archive
        archive: PathBuf,
    },
    /// List metadata of every version in a space
    List {
        space: String,
        /// Only the latest version of each package
        #[arg(long, default_value_t = false)]
        latest: bool,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// List metadata of every version of a package
    Versions {
        space: String,
        package: String,
        #[command(flatten)]
        paging: PagingArgs,
    },
    /// Show metadata of the latest version of a package
    Latest { space: String, package: String },
    /// Version metadata commands
    Metadata {
        #[command(subcommand)]
        command: MetadataCommands,
    },
    /// Version values commands
    Values {
        #[command(subcommand)]
        command: ValuesCommands,
    },
}

#[derive(Subcommand)]
enum MetadataCommands {
    /// Show metadata of a version
    Get {
        #[command(flatten)]
        target: VersionArgs,
    },
    /// Replace metadata of a version from a JSON document
    Set {
        #[command(flatten)]
        target: VersionArgs,
        /// JSON file, or "-" for stdin
        input: String,
    },
}

#[derive(Subcommand)]
enum ValuesCommands {
    /// Print the stored values
    Get {
        #[command(flatten)]
        target: VersionArgs,
        /// Render as JSON instead of the stored TOML
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replace values of a version from a JSON object
    Set {
        #[command(flatten)]
        target: VersionArgs,
        /// JSON file, or "-" for stdin
        input: String,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{out}");
    Ok(())
}

fn print_raw(data: &[u8]) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(data)?;
    if !data.ends_with(b"\n") {
        stdout.write_all(b"\n")?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { config, command } = Cli::parse();
    let config = config::load_config(config.as_deref())?;
    let app = App::from_config(config).await?;
    let registry = app.registry();

    // Ctrl-C cancels the in-flight operation.
    let cancel = CancellationToken::new();
    let ctx = registry.op_context_with(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    match command {
        Commands::Push { space, archive } => print_json(&app.push(&space, &archive).await?),
        Commands::List {
            space,
            latest,
            paging,
        } => {
            let req = RequestContext::new(space).with_paging(paging.start, paging.limit);
            let page = if latest {
                registry.list_latest_metadata_in_space(&ctx, &req).await
            } else {
                registry.list_metadata_in_space(&ctx, &req).await
            };
            print_json(&page.map_err(report)?)
        }
        Commands::Versions {
            space,
            package,
            paging,
        } => {
            let req = RequestContext::new(space)
                .with_package(package)
                .with_paging(paging.start, paging.limit);
            print_json(
                &registry
                    .list_metadata_in_package(&ctx, &req)
                    .await
                    .map_err(report)?,
            )
        }
        Commands::Latest { space, package } => {
            let req = RequestContext::new(space).with_package(package);
            print_json(
                &registry
                    .get_latest_metadata_in_package(&ctx, &req)
                    .await
                    .map_err(report)?,
            )
        }
        Commands::Metadata { command } => match command {
            MetadataCommands::Get { target } => print_json(
                &registry
                    .fetch_metadata(&ctx, &target.request())
                    .await
                    .map_err(report)?,
            ),
            MetadataCommands::Set { target, input } => {
                let req = target.request().with_body(read_input(&input).await?);
                print_json(&registry.update_metadata(&ctx, &req).await.map_err(report)?)
            }
        },
        Commands::Values { command } => match command {
            ValuesCommands::Get { target, json } => {
                print_raw(&app.values(&ctx, &target.request(), json).await?)
            }
            ValuesCommands::Set { target, input } => {
                let req = target.request().with_body(read_input(&input).await?);
                print_raw(&registry.update_values(&ctx, &req).await.map_err(report)?)
            }
        },
    }
}
