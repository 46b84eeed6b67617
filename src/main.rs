use chrono::Utc;
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use venue_booking::{
    api::{AppState, router},
    auth::InMemorySessions,
    config::{
        database::{DEFAULT_DATABASE_URL, create_connection, create_tables, get_database_url},
        settings::{load_default_config, webhook_secret},
    },
    core::{booking::sweep_stale_pending, seed::seed_from_config},
    errors::Result,
    payment::SandboxPaymentProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = load_default_config()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(
        venues = app_config.venues.len(),
        packages = app_config.packages.len(),
        "Successfully processed application configuration."
    );

    // 4. Initialize database
    if get_database_url() == DEFAULT_DATABASE_URL {
        std::fs::create_dir_all("data")?;
    }
    let db = create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    create_tables(&db)
        .await
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed venues and packages from config
    seed_from_config(&db, &app_config)
        .await
        .inspect(|()| info!("Configured venues seeded successfully."))
        .inspect_err(|e| error!("Failed to seed configured venues: {}", e))?;

    // 6. The webhook secret is read directly before use, not stored in AppConfig
    let secret = webhook_secret().inspect_err(|e| error!("Payment webhook secret unavailable: {}", e))?;

    // 7. Build shared state
    let sessions = InMemorySessions::from_seeds(&app_config.sessions)?;
    let settings = Arc::new(app_config.booking);
    let state = AppState {
        db: db.clone(),
        payment: Arc::new(SandboxPaymentProvider::new(settings.checkout_base_url.clone())),
        sessions: Arc::new(sessions),
        settings: Arc::clone(&settings),
        webhook_secret: Arc::from(secret),
    };

    // 8. Cancel bookings whose checkout was never completed
    let pending_timeout = settings
        .pending_timeout()
        .inspect_err(|e| error!("Invalid reconciliation settings: {}", e))?;
    let sweep_every = Duration::from_secs(settings.sweep_interval_seconds);
    tokio::spawn(run_pending_sweep(db, pending_timeout, sweep_every));

    // 9. Serve until Ctrl-C
    let listener = tokio::net::TcpListener::bind(&app_config.server.bind_address)
        .await
        .inspect_err(|e| error!("Failed to bind {}: {}", app_config.server.bind_address, e))?;
    info!("Listening on {}", app_config.server.bind_address);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped.");
    Ok(())
}

async fn run_pending_sweep(db: DatabaseConnection, timeout: chrono::Duration, every: Duration) {
    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;
        match sweep_stale_pending(&db, timeout, Utc::now()).await {
            Ok(0) => {}
            Ok(swept) => info!(swept, "Cancelled unpaid bookings"),
            Err(e) => error!("Pending booking sweep failed: {}", e),
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received.");
}
