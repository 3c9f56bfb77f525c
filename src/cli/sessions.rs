// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::config::TryOnConfig;
use crate::contracts::{EthersLedgerStore, LedgerStore, Web3Client};
use crate::fhe::RelayerClient;
use crate::sessions::{
    FitAnalysis, NewSession, Session, SessionLifecycleController, TransactionState,
};

/// Arguments for the list command
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only show sessions whose label contains this text
    #[arg(long)]
    pub search: Option<String>,
}

/// Arguments for the create command
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Session name
    #[arg(long)]
    pub label: String,

    /// Weight in kg, stored in clear
    #[arg(long)]
    pub weight: u32,

    /// Height in cm, encrypted before submission
    #[arg(long)]
    pub height: u32,

    #[arg(long, default_value = "dress")]
    pub clothing_type: String,
}

/// Arguments for the reveal command
#[derive(Args, Debug)]
pub struct RevealArgs {
    /// Session id, e.g. tryon-1700000000000
    pub id: String,
}

/// Wire the controller to the configured RPC, registry and relayer
pub async fn bootstrap(config_path: Option<&Path>) -> Result<SessionLifecycleController> {
    let config = TryOnConfig::load(config_path)?;
    let web3 = Web3Client::new(config.web3_config()).await?;
    let ledger_config = config.ledger_config()?;

    let ledger: Arc<dyn LedgerStore> = match web3.signer() {
        Some(signer) => Arc::new(EthersLedgerStore::new(signer, ledger_config)),
        None => Arc::new(EthersLedgerStore::new(web3.provider.clone(), ledger_config)),
    };
    let relayer = Arc::new(RelayerClient::new(config.relayer_config())?);

    let controller = SessionLifecycleController::new(
        config.controller_config()?,
        ledger,
        relayer.clone(),
        relayer,
    );
    if let Some(account) = web3.account() {
        controller.connect(account).await;
    }

    info!(
        "Connected to chain {} via {}, registry {:?}",
        config.chain_id,
        config.rpc_url,
        controller.contract_address()
    );
    Ok(controller)
}

pub async fn list(controller: &SessionLifecycleController, args: ListArgs) -> Result<()> {
    controller.refresh_sessions().await;
    let sessions = controller
        .search(args.search.as_deref().unwrap_or_default())
        .await;

    if sessions.is_empty() {
        println!("No virtual try-on sessions found");
    }
    for session in &sessions {
        print_session(session);
    }
    print_status(&controller.transaction_state());
    Ok(())
}

pub async fn create(controller: &SessionLifecycleController, args: CreateArgs) -> Result<()> {
    let request = NewSession::new(args.label, args.weight, args.height)
        .with_clothing_type(args.clothing_type);

    let result = controller.create_session(request).await;
    print_status(&controller.transaction_state());

    let session = result?;
    print_session(&session);
    Ok(())
}

pub async fn reveal(controller: &SessionLifecycleController, args: RevealArgs) -> Result<()> {
    controller.refresh_sessions().await;
    let session = controller
        .session(&args.id)
        .await
        .ok_or_else(|| anyhow!("Session {} not found", args.id))?;

    let result = controller.reveal_session(&session).await;
    print_status(&controller.transaction_state());

    match result? {
        Some(height) => println!("Height: {}cm", height),
        None => {
            if let Some(refreshed) = controller.session(&args.id).await {
                println!("Height: {}", refreshed.verification.describe());
            }
        }
    }

    if let Some(analysis) = controller.analyze(&args.id).await {
        print_analysis(&analysis);
    }
    Ok(())
}

pub async fn available(controller: &SessionLifecycleController) -> Result<()> {
    let ok = controller.check_availability().await;
    print_status(&controller.transaction_state());
    if ok {
        Ok(())
    } else {
        Err(anyhow!("System unavailable"))
    }
}

pub async fn stats(controller: &SessionLifecycleController) -> Result<()> {
    controller.refresh_sessions().await;
    let now = chrono::Utc::now().timestamp().max(0) as u64;
    let summary = controller.summary(now).await;

    println!("Total try-on sessions: {} (+{} this week)", summary.total, summary.recent);
    println!("FHE verified data:     {}/{}", summary.verified, summary.total);
    println!("Average weight:        {:.1}kg", summary.average_public_field);
    Ok(())
}

fn print_session(session: &Session) {
    println!(
        "{}  {:<24} weight {:>3}kg  height {}  [{}]",
        session.id,
        session.label,
        session.public_field,
        session.verification.describe(),
        session.tag
    );
}

fn print_analysis(analysis: &FitAnalysis) {
    println!("Comfort score:   {}", analysis.comfort);
    println!("Style match:     {}", analysis.style_match);
    println!("Size accuracy:   {}", analysis.size_accuracy);
    println!("Recommendation:  {}", analysis.recommendation);
    println!("Trend score:     {}", analysis.trend_score);
}

fn print_status(state: &TransactionState) {
    let Some(message) = state.message() else {
        return;
    };
    match state {
        TransactionState::Failed(_) => eprintln!("✗ {}", message),
        TransactionState::Succeeded(_) => println!("✓ {}", message),
        _ => println!("… {}", message),
    }
}
