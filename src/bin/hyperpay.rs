use std::{fs::File, path::PathBuf};

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use hyperpay_transfer::{auth::PeerConfig, bin_utils::Service};
use tracing_subscriber::EnvFilter;

/// Replays contract invocations against a simulated peer and prints the
/// committed accounts as CSV.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(ArgGroup::new("peer").required(true).args(["peer_org", "config"])))]
struct Args {
    /// Invocation file (`org,function,arg1,arg2,arg3`)
    file: PathBuf,
    /// Organization the local peer belongs to
    #[arg(long)]
    peer_org: Option<String>,
    /// TOML file with the peer configuration
    #[arg(long)]
    config: Option<PathBuf>,
}

fn peer_config(args: &Args) -> Result<PeerConfig> {
    if let Some(path) = &args.config {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read `{}`", path.display()))?;
        return PeerConfig::from_toml(&source)
            .with_context(|| format!("Invalid peer configuration in `{}`", path.display()));
    }
    let peer_org = args.peer_org.clone().unwrap_or_default();
    PeerConfig::new(peer_org).context("Invalid --peer-org")
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let peer = peer_config(&args)?;
    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open `{}`", args.file.display()))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        peer,
        error_printer: Box::new(|line, err| eprintln!("Error at line {line}: {err}")),
    };
    service.run()
}
