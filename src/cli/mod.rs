// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod sessions;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Confidential virtual try-on CLI
#[derive(Parser, Debug)]
#[command(name = "tryon-cli")]
#[command(version = "0.1.0")]
#[command(about = "Create and reveal FHE-protected try-on sessions", long_about = None)]
pub struct Cli {
    /// Optional TOML config file with a [tryon] table
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List sessions from the registry
    List(sessions::ListArgs),

    /// Encrypt a height and create a new session
    Create(sessions::CreateArgs),

    /// Decrypt and verify a session's height on-chain
    Reveal(sessions::RevealArgs),

    /// Check whether the registry reports the system as available
    Available,

    /// Dashboard statistics over all sessions
    Stats,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let controller = sessions::bootstrap(cli.config.as_deref()).await?;

    match cli.command {
        Commands::List(args) => sessions::list(&controller, args).await,
        Commands::Create(args) => sessions::create(&controller, args).await,
        Commands::Reveal(args) => sessions::reveal(&controller, args).await,
        Commands::Available => sessions::available(&controller).await,
        Commands::Stats => sessions::stats(&controller).await,
    }
}
