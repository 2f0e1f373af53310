//! AppHub API server binary

use actix_web::middleware::{Logger, from_fn};
use actix_web::{App, HttpServer, web};
use apphub_api::db::Db;
use apphub_api::{AppState, Config, gate, notifier, routes};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    initialize_tracing();

    info!("Starting AppHub API v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Server configuration - Environment: {}, Address: {}:{}, Notifier: {}",
        config.environment,
        config.host,
        config.port,
        config.notifier_base_url().unwrap_or("disabled")
    );

    let db = match Db::connect(&config.database_url, config.db_max_connections).await {
        Ok(db) => db,
        Err(e) => {
            error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db.migrate().await {
        error!("Database migration failed: {}", e);
        std::process::exit(1);
    }

    let notifier = match notifier::from_config(&config) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!("Notifier setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let bind_address = (config.host.clone(), config.port);
    let state = web::Data::new(AppState::new(db, notifier, config));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
            .wrap(from_fn(gate::admission))
            .wrap(Logger::default())
    })
    .bind(bind_address)?
    .run()
    .await
}

/// Initialize structured logging
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
