//! Screener daemon - runs the alert schedulers (one per cadence group,
//! §4.6) and, when built with the `http` feature, the HTTP surface
//! (§6.1) side by side, sharing one store and one subscription
//! repository. Shuts down gracefully on Ctrl-C.

use screener::alerts::{Cadence, InMemoryAlertRepository, Scheduler};
#[cfg(feature = "http")]
use screener::catalog::CATALOG;
use screener::config::Settings;
use screener::notify::LoggingSink;
use screener::store::DataStore;
use screener::validation::ValidatorSettings;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let store: Arc<dyn DataStore> = {
        #[cfg(feature = "store-postgres")]
        {
            let connection_string = match settings.database.resolved_connection_string() {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "failed to resolve database connection string");
                    return ExitCode::FAILURE;
                }
            };
            match screener::store::PostgresStore::connect(&connection_string, settings.database.max_connections).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(error = %e, "failed to connect to the database");
                    return ExitCode::FAILURE;
                }
            }
        }
        #[cfg(not(feature = "store-postgres"))]
        {
            tracing::error!("no store backend compiled in; build with the store-postgres feature");
            return ExitCode::FAILURE;
        }
    };

    let repo = Arc::new(InMemoryAlertRepository::new());
    let validator_settings = ValidatorSettings::from(&settings.validator);

    let cadences = [Cadence::Realtime, Cadence::EveryFiveMinutes, Cadence::Hourly, Cadence::Daily];
    let mut shutdown_txs = Vec::with_capacity(cadences.len());
    let mut scheduler_handles = Vec::with_capacity(cadences.len());

    for cadence in cadences {
        let (tx, rx) = oneshot::channel();
        shutdown_txs.push(tx);

        let scheduler = Scheduler::new(
            store.clone(),
            repo.clone(),
            Arc::new(LoggingSink),
            cadence,
            &settings.scheduler,
            validator_settings,
        );
        scheduler_handles.push(tokio::spawn(async move {
            scheduler.run(rx).await;
        }));
    }

    #[cfg(feature = "http")]
    let http_handle = {
        let state = screener::http::AppState::new(store.clone(), repo.clone(), &CATALOG, &settings.validator, settings.compiler.clone());
        let router = screener::http::build_router(state);
        let addr = std::env::var("SCREENER_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        match tokio::net::TcpListener::bind(&addr).await {
            Ok(listener) => {
                info!(%addr, "listening");
                Some(tokio::spawn(async move {
                    if let Err(e) = axum::serve(listener, router).await {
                        tracing::error!(error = %e, "http server exited with an error");
                    }
                }))
            }
            Err(e) => {
                tracing::error!(error = %e, %addr, "failed to bind http listener");
                None
            }
        }
    };

    info!("screener daemon started");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
    info!("shutting down");

    for tx in shutdown_txs {
        let _ = tx.send(());
    }
    for handle in scheduler_handles {
        let _ = handle.await;
    }

    #[cfg(feature = "http")]
    if let Some(handle) = http_handle {
        handle.abort();
    }

    ExitCode::SUCCESS
}
