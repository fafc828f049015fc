//! Operator CLI over the wallet service. Results are printed as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use identity_wallet_lib::WalletService;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "identity-wallet",
    about = "Derive and manage per-identity wallets",
    version
)]
struct Cli {
    #[arg(
        long,
        env = "IDENTITY_WALLET_ROOT",
        default_value = "identity-wallet-data",
        help = "wallet data directory"
    )]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Show the identity's addresses, creating the wallet on first use.
    Show { identity: String },

    /// Replace the identity's wallet with a fresh one.
    Regenerate { identity: String },

    /// Print the recovery phrase and exported private keys.
    Export { identity: String },

    /// Restore the identity's wallet from a recovery phrase.
    Import {
        identity: String,
        phrase: String,
        #[arg(long, default_value = "", help = "optional seed passphrase")]
        passphrase: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let service = WalletService::open(&cli.root)
        .with_context(|| format!("failed to open wallet directory {}", cli.root.display()))?;

    match cli.command {
        Commands::Show { identity } => print(&service.get_or_create_wallet(&identity)?),
        Commands::Regenerate { identity } => print(&service.regenerate_wallet(&identity)?),
        Commands::Export { identity } => print(&service.export_wallet(&identity)?),
        Commands::Import {
            identity,
            phrase,
            passphrase,
        } => print(&service.import_wallet(&identity, &phrase, &passphrase)?),
    }
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
