use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use custody_backend::chain_events::ChainListener;
use custody_backend::config::Config;
use custody_backend::controllers;
use custody_backend::db::{Database, StatusDatabase};
use custody_backend::flow::AccessClient;
use custody_backend::templates::Templates;
use custody_backend::AppState;

const JOB_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// How long finished jobs stay queryable
const FINISHED_JOB_RETENTION_MINUTES: i64 = 60;

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env().map_err(|e| startup_error("Invalid configuration", e))?;
    let port = config.port;

    log::info!("Initializing database at {}", config.database_url);
    let db = Database::new(&config.database_url)
        .map_err(|e| startup_error("Failed to initialize database", e))?;
    let db = Arc::new(db);

    let status_db = StatusDatabase::new(&config.status_database_url)
        .map_err(|e| startup_error("Failed to initialize listener status database", e))?;
    let status_db = Arc::new(status_db);

    let templates = Arc::new(Templates::new(config.chain_id, config.enabled_tokens.clone()));

    log::info!("Connecting to access API at {}", config.access_api_url);
    let reader = AccessClient::new(&config.access_api_url)
        .map_err(|e| startup_error("Invalid access API URL", e))?;

    let listener = Arc::new(ChainListener::new(
        Arc::new(reader),
        status_db.clone(),
        templates.deposit_event_types(),
        config.events_interval,
        config.events_max_blocks,
    ));
    let cancel = CancellationToken::new();

    // Log deposits into managed accounts
    let mut deposits = listener.subscribe();
    let deposit_templates = templates.clone();
    tokio::spawn(async move {
        loop {
            match deposits.recv().await {
                Ok(event) => match deposit_templates.token_from_event(&event) {
                    Ok(token) => log::info!(
                        "[ChainEvents] {} deposit in {} at height {}: {}",
                        token.canon_name(),
                        event.transaction_id,
                        event.block_height,
                        event.payload
                    ),
                    Err(e) => log::warn!("[ChainEvents] Unrecognized event {}: {}", event.event_type, e),
                },
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("[ChainEvents] Deposit logger fell behind, missed {} events", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let listener_task = {
        let listener = listener.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { listener.run(cancel).await })
    };

    // Submission needs a signing ledger client and key custody, which a host
    // adds with `AppState::with_submission`; this binary serves reads.
    let state = web::Data::new(AppState::new(config, db, status_db, templates));

    // Release finished jobs so the registry does not grow without bound
    let cleanup_task = {
        let jobs = state.jobs.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(JOB_CLEANUP_INTERVAL);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        jobs.cleanup_finished(chrono::Duration::minutes(FINISHED_JOB_RETENTION_MINUTES));
                    }
                }
            }
        })
    };
    let jobs = state.jobs.clone();

    log::info!("Starting custody backend on port {}", port);

    let result = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(cors)
            .configure(controllers::health::config)
            .configure(controllers::transactions::config)
            .configure(controllers::jobs::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await;

    cancel.cancel();
    if let Err(e) = listener_task.await {
        log::error!("[ChainEvents] Listener task failed: {}", e);
    }
    if let Err(e) = cleanup_task.await {
        log::error!("[JobPool] Cleanup task failed: {}", e);
    }
    jobs.shutdown().await;
    result
}
