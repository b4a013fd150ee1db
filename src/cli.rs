use clap::{Parser, Subcommand};
use sqlx::PgPool;

use crate::adapters::PostgresTransactionRepository;
use crate::config::Config;
use crate::domain::TransactionId;
use crate::ports::{RepositoryError, TransactionRepository};

#[derive(Parser)]
#[command(name = "paybroker")]
#[command(about = "Payment session broker - gateway checkout and callback reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Transaction inspection commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Print a transaction record as JSON
    Show {
        /// Transaction id as sent to the gateway (tran_id)
        #[arg(value_name = "TRAN_ID")]
        tran_id: String,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_tx_show(pool: &PgPool, tran_id: &str) -> anyhow::Result<()> {
    let repository = PostgresTransactionRepository::new(pool.clone());

    match repository.get(&TransactionId::from(tran_id)).await {
        Ok(tx) => {
            println!("{}", serde_json::to_string_pretty(&tx)?);
            Ok(())
        }
        Err(RepositoryError::NotFound(_)) => {
            tracing::warn!("Transaction {} not found", tran_id);
            anyhow::bail!("Transaction {} not found", tran_id)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn handle_db_migrate(pool: &PgPool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");
    crate::db::run_migrations(pool).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub async fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");

    println!("Configuration:");
    println!("  Server Port: {}", config.server_port);
    println!("  Database URL: {}", mask_password(&config.database_url));
    println!("  Gateway: {} (live: {})", config.gateway_base_url, config.is_live);
    println!("  Store ID: {}", config.store_id);
    println!("  Public Base URL: {}", config.public_base_url);
    println!("  Frontend URL: {}", config.frontend_url);
    println!("  CORS Origins: {}", config.cors_allowed_origins.join(", "));

    let pool = match crate::db::create_pool(config).await {
        Ok(pool) => Some(pool),
        Err(e) => {
            tracing::warn!("Could not connect to database: {}", e);
            None
        }
    };

    let report = crate::startup::validate_environment(config, pool.as_ref()).await;
    report.print();

    if !report.is_valid() {
        anyhow::bail!("Configuration is invalid");
    }

    tracing::info!("Configuration is valid");
    Ok(())
}

fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if let Some(slash_pos) = url[..colon_pos].rfind("//") {
                let prefix = &url[..slash_pos + 2];
                let user_start = slash_pos + 2;
                let user = &url[user_start..colon_pos];
                let suffix = &url[at_pos..];
                return format!("{}{}:****{}", prefix, user, suffix);
            }
        }
    }
    url.to_string()
}
