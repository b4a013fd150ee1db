use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt}; // for .with() on registry

use paybroker::adapters::PostgresTransactionRepository;
use paybroker::cli::{self, Cli, Commands, DbCommands, TxCommands};
use paybroker::config::{Config, LogFormat};
use paybroker::gateway::SslCommerzClient;
use paybroker::ports::CallbackUrls;
use paybroker::services::TransactionLifecycle;
use paybroker::{create_app, db, middleware, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    init_tracing(config.log_format);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Tx(TxCommands::Show { tran_id }) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_tx_show(&pool, &tran_id).await
        }
        Commands::Db(DbCommands::Migrate) => {
            let pool = db::create_pool(&config).await?;
            cli::handle_db_migrate(&pool).await
        }
        Commands::Config => cli::handle_config_validate(&config).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    // Database pool
    let pool = db::create_pool(&config).await?;
    db::run_migrations(&pool).await?;

    let repository = Arc::new(PostgresTransactionRepository::new(pool));
    let gateway = Arc::new(SslCommerzClient::new(
        config.gateway_base_url.clone(),
        config.store_id.clone(),
        config.store_passwd.clone(),
    ));
    tracing::info!(
        "Gateway client initialized with URL: {} (live: {})",
        config.gateway_base_url,
        config.is_live
    );

    let lifecycle = TransactionLifecycle::new(
        repository,
        gateway,
        CallbackUrls::from_base(&config.public_base_url),
        config.gateway_timeout(),
    );

    let app_state = AppState {
        lifecycle: Arc::new(lifecycle),
        frontend_url: config.frontend_url.clone(),
    };

    let app = create_app(app_state).layer(middleware::cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
