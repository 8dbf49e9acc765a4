use clap::Parser;
use jobboard_server::{
    cli::{Cli, Commands},
    config::ServerConfig,
    geo::MapQuestGeocoder,
    router::{build_router, API_PREFIX},
    state::ServerState,
    storage::{LocalResumeStore, PostgresJobStore, PostgresUserStore},
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "jobboard_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Startup failures exit non-zero so a supervisor can restart us
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_env()?;

    // Connect to database
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;

    // Initialize storage layers; jobs reference users
    let user_store = PostgresUserStore::new(pool.clone());
    user_store.initialize().await?;

    let job_store = PostgresJobStore::new(pool.clone());
    job_store.initialize().await?;

    let resumes = LocalResumeStore::new(&config.upload_directory);
    resumes.initialize().await?;

    match cli.command {
        Some(Commands::User(cmd)) => return cmd.execute(pool, &config).await,
        Some(Commands::Serve) | None => {}
    }

    info!("🚀 Starting Job Board Server v{}", VERSION);
    info!("📋 Configuration loaded:");
    info!("   Port: {}", config.port);
    info!("   Bind address: {}", config.bind_addr);
    info!("   Environment: {}", config.environment);
    info!("   Upload directory: {:?}", config.upload_directory);
    info!("   Public job reads: {}", config.public_job_reads);
    info!("   CORS origins: {:?}", config.cors_origins);
    info!("✅ Database connected and schema initialized");

    if config.geocoder_api_key.is_none() {
        warn!("GEOCODER_API_KEY not set; radius search is unavailable and new jobs are stored without location");
    }
    let geocoder = MapQuestGeocoder::new(&config.geocoder_url, config.geocoder_api_key.clone())?;

    let state = Arc::new(ServerState::new(
        config.clone(),
        Arc::new(user_store),
        Arc::new(job_store),
        Arc::new(resumes),
        Arc::new(geocoder),
    ));

    let app = build_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    info!("🎧 Listening on http://{}{}", addr, API_PREFIX);
    info!("🔑 Health endpoint: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
