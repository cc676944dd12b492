use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shwary_gateway::adapters::PostgresTransactionRepository;
use shwary_gateway::cli::{self, Cli, Commands};
use shwary_gateway::config::Config;
use shwary_gateway::events::EventBus;
use shwary_gateway::ports::TransactionRepository;
use shwary_gateway::services::PaymentService;
use shwary_gateway::{create_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(&config).await,
        Commands::Sweep { older_than } => {
            let (service, _repository) = build_service(&config).await?;
            cli::handle_sweep(&service, older_than).await
        }
        Commands::Config => cli::handle_config_validate(&config),
    }
}

async fn build_service(
    config: &Config,
) -> anyhow::Result<(Arc<PaymentService>, Arc<dyn TransactionRepository>)> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let repository: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool));
    let events = Arc::new(EventBus::new());
    let service = Arc::new(PaymentService::from_config(
        config,
        repository.clone(),
        events,
    ));

    Ok((service, repository))
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let (service, repository) = build_service(config).await?;

    let app = create_app(AppState {
        service,
        repository,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
