/*!

This is the command line interface for running the RHCS resources and data sources against the
OpenShift Cluster Manager API. It plays the part of the host: states and plans are read as JSON
documents and the resulting state is printed together with its diagnostics.

!*/

mod data;
mod input;
mod list_types;
mod resource;
mod thumbprint;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use rhcs_model::Configuration;
use rhcs_provider::registry::Registry;
use rhcs_provider::thumbprint::TlsThumbprintFetcher;
use rhcs_provider::{init_logger, ProviderConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Manage ROSA clusters and related objects through the OpenShift Cluster Manager API.
#[derive(Debug, Parser)]
#[clap(author, version, about)]
struct Args {
    /// Set logging verbosity [trace|debug|info|warn|error]. If the environment variable `RUST_LOG`
    /// is present, it overrides the default logging behavior. See https://docs.rs/env_logger/latest
    #[clap(long = "log-level", default_value = "info")]
    log_level: LevelFilter,
    /// Path to a JSON file with the provider configuration. `url` and `token` fall back to the
    /// OCM_URL and OCM_TOKEN environment variables.
    #[clap(long = "provider-config")]
    provider_config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    /// Run an operation on a resource.
    Resource(resource::ResourceCommand),
    /// Read a data source.
    Data(data::Data),
    /// Print the thumbprint of the certificate authority behind an OIDC endpoint.
    Thumbprint(thumbprint::Thumbprint),
    /// List the resource and data source types.
    ListTypes(list_types::ListTypes),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logger(env!("CARGO_CRATE_NAME"), args.log_level);
    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{:?}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when the operation reported an error diagnostic.
async fn run(args: Args) -> Result<bool> {
    if let Command::Thumbprint(thumbprint) = args.command {
        return thumbprint.run().await.map(|()| true);
    }
    let registry = registry(args.provider_config).await?;
    match args.command {
        Command::Resource(resource) => resource.run(&registry).await,
        Command::Data(data) => data.run(&registry).await,
        Command::ListTypes(list_types) => list_types.run(&registry).map(|()| true),
        Command::Thumbprint(_) => Ok(true),
    }
}

async fn registry(provider_config: Option<PathBuf>) -> Result<Registry> {
    let config = match provider_config {
        Some(path) => {
            let value = input::read_json(&path).await?;
            ProviderConfig::from_value(value).context(format!(
                "Unable to read the provider configuration in '{}'",
                path.display()
            ))?
        }
        None => ProviderConfig::default(),
    }
    .with_env();
    let client = config
        .client()
        .context("Unable to create the OpenShift Cluster Manager client")?;
    let fetcher =
        TlsThumbprintFetcher::new().context("Unable to create the thumbprint fetcher")?;
    Ok(rhcs_resources::registry(
        Arc::new(client),
        config.build_info(),
        Arc::new(fetcher),
    ))
}
