//! trustmark-ledger: operator console for the ledger store.
//!
//! Runs one command against the configured store (see `LedgerConfig`) and
//! prints the result as JSON.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use trustmark_auth::PrincipalId;
use trustmark_core::ProductId;
use trustmark_infra::{LedgerConfig, LedgerError};
use trustmark_service::app::dto::{DecideRequest, GrantAdminRequest};
use trustmark_service::app::{LedgerService, ledger_error_to_outcome};

#[derive(Parser, Debug)]
#[command(name = "trustmark-ledger")]
#[command(about = "Operator console for the product lifecycle ledger")]
struct Args {
    /// Principal the command runs as
    #[arg(long = "as", global = true)]
    acting_as: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Claim the first administrator seat for --as
    Bootstrap,
    /// Grant administrator rights
    Grant { email: String },
    /// List administrators
    Admins,
    /// List company applications
    Applications {
        #[arg(long, default_value = "pending")]
        status: String,
    },
    /// Approve or reject a pending application
    Decide {
        id: String,
        #[arg(value_parser = ["approve", "reject"])]
        action: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Mark a brand verified
    VerifyBrand { slug: String },
    /// Withdraw a brand's verification
    UnverifyBrand { slug: String },
    /// Show the verification view of a product
    Verify { product_id: u64 },
    /// Show the ownership history of a product
    History { product_id: u64 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    trustmark_observability::tracing::init_with_default(&args.log_level);

    let config = LedgerConfig::from_env().context("invalid configuration")?;
    let service = LedgerService::connect(&config)
        .await
        .context("failed to open ledger store")?;

    let principal = PrincipalId::parse_optional(args.acting_as.as_deref()).context("invalid --as principal")?;
    let requester = service.requester(principal).await.map_err(report)?;

    match args.command {
        Command::Bootstrap => emit(&service.bootstrap_admin(&requester).await.map_err(report)?),
        Command::Grant { email } => emit(
            &service
                .grant_admin(&requester, GrantAdminRequest { email })
                .await
                .map_err(report)?,
        ),
        Command::Admins => emit(&service.list_admins(&requester).await.map_err(report)?),
        Command::Applications { status } => emit(
            &service
                .list_applications(&requester, Some(&status))
                .await
                .map_err(report)?,
        ),
        Command::Decide { id, action, reason } => emit(
            &service
                .decide_application(&requester, &id, DecideRequest { action, reason })
                .await
                .map_err(report)?,
        ),
        Command::VerifyBrand { slug } => emit(&service.verify_brand(&requester, &slug).await.map_err(report)?),
        Command::UnverifyBrand { slug } => emit(&service.unverify_brand(&requester, &slug).await.map_err(report)?),
        Command::Verify { product_id } => {
            let id = ProductId::new(product_id)?;
            emit(&service.verify_product(&requester, id).await.map_err(report)?)
        }
        Command::History { product_id } => {
            let id = ProductId::new(product_id)?;
            emit(&service.product_history(&requester, id).await.map_err(report)?)
        }
    }
}

fn emit<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report(err: LedgerError) -> anyhow::Error {
    let outcome = ledger_error_to_outcome(err);
    let hint = if outcome.retryable { " (retryable)" } else { "" };
    anyhow::anyhow!("{} [{}]: {}{}", outcome.code, outcome.status, outcome.message, hint)
}
