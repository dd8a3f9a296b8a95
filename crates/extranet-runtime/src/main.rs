//! # Copro Extranet
//!
//! Entry point of the document extranet.
//!
//! ## Commands
//!
//! - `serve` (default) - HTTP API plus the daily expiry sweep
//! - `sweep` - one expiry sweep, then exit
//! - `hash-password` - print a bcrypt hash
//! - `create-admin` - bootstrap an administrator account

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use extranet_api::ApiServer;
use extranet_core::{BcryptHasher, PasswordHasher, SettingsApi};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use extranet_runtime::config::{self, RuntimeConfig};
use extranet_runtime::{build_service, scheduler};

#[derive(Debug, Parser)]
#[command(name = "extranet", version, about = "Copro document extranet")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API and schedule the expiry sweep
    Serve,
    /// Flag expired documents and notify administrators, once
    Sweep,
    /// Print the bcrypt hash of a password
    HashPassword { password: String },
    /// Create an administrator account
    CreateAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        surname: String,
        /// Generated and printed when omitted
        #[arg(long)]
        password: Option<String>,
    },
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| anyhow!("failed to initialize logging: {e}"))
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

async fn serve(config: RuntimeConfig) -> Result<()> {
    config.validate_for_serve().context("invalid configuration")?;
    let service = build_service(&config)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = tokio::spawn(scheduler::run(service.clone(), config.sweep, shutdown_rx));

    let server = ApiServer::new(config.api, service).await?;
    let result = server
        .run(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await;

    if let Err(e) = sweeper.await {
        error!(error = %e, "sweep scheduler task failed");
    }
    result.map_err(Into::into)
}

async fn sweep(config: RuntimeConfig) -> Result<()> {
    config.validate().context("invalid configuration")?;
    let service = build_service(&config)?;
    let report = scheduler::sweep_once(&service).await?;
    info!(
        expired = report.expired.len(),
        notified = report.notified,
        "Expiry sweep finished"
    );
    Ok(())
}

async fn create_admin(
    config: RuntimeConfig,
    email: String,
    first_name: String,
    surname: String,
    password: Option<String>,
) -> Result<()> {
    let service = build_service(&config)?;
    let created = tokio::task::spawn_blocking(move || {
        service.create_admin(&email, &first_name, &surname, password.as_deref())
    })
    .await?
    .context("failed to create administrator")?;

    println!("Administrator created (id {})", created.user_id);
    if let Some(password) = created.generated_password {
        println!("Generated password: {password}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(config::log_json_from_env())?;

    let cli = Cli::parse();
    let config = RuntimeConfig::from_env();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Sweep => sweep(config).await,
        Command::HashPassword { password } => {
            let hash = BcryptHasher::new(config.bcrypt_cost)
                .hash(&password)
                .context("failed to hash password")?;
            println!("{hash}");
            Ok(())
        }
        Command::CreateAdmin {
            email,
            first_name,
            surname,
            password,
        } => create_admin(config, email, first_name, surname, password).await,
    }
}
