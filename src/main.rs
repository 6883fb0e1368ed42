//! `tuber` CLI - resolve a media page URI and print its streams

mod cmd;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use tuber::{Client, Config};

#[derive(Parser)]
#[command(name = "tuber")]
#[command(about = "Resolve media page URIs into playable streams")]
#[command(version)]
struct Cli {
    /// Media URI (or a bare YouTube video id)
    uri: Option<String>,

    /// Print the media info as JSON
    #[arg(long)]
    json: bool,

    /// List registered extractors in lookup order
    #[arg(long)]
    list_extractors: bool,

    /// Only report which extractor would handle the URI
    #[arg(long)]
    which: bool,

    /// Resolution deadline in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Config file (defaults to the user config dir)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => Config::from_path(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Ignoring unusable config: {e:#}");
            Config::default()
        }),
    };
    if let Some(secs) = cli.timeout {
        config.timeout_secs = secs;
    }

    let client = Client::from_config(&config)?;

    if cli.list_extractors {
        cmd::extractors::list(client.registry());
        return Ok(ExitCode::SUCCESS);
    }

    let Some(uri) = cli.uri else {
        eprintln!("No URI provided as argument!");
        return Ok(ExitCode::from(1));
    };

    if cli.which {
        cmd::extractors::which(client.registry(), &uri);
    } else {
        cmd::info::cmd_info(&client, &uri, cli.json).await?;
    }

    Ok(ExitCode::SUCCESS)
}
