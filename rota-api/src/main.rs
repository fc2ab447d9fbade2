use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rota_api::collaborators::{AllowAllPreferences, LogTransport, PlainTicketRenderer};
use rota_api::{app, AppState};
use rota_booking::BookingEngine;
use rota_core::pricing::PriceSchedule;
use rota_store::{DbClient, PgStore};
use rota_tasks::{
    run_periodic, AutoCancellationSweeper, DispatcherConfig, NotificationDispatcher,
    PricingAdjuster, SweepConfig,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rota_api=debug,rota_tasks=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rota_store::Config::load().expect("Failed to load config");
    let rules = config.business_rules.clone();
    tracing::info!("Starting Rota API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    let store = Arc::new(PgStore::new(db.pool.clone()));

    let engine = Arc::new(BookingEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
    ));

    let sweeper = Arc::new(AutoCancellationSweeper::new(
        engine.clone(),
        store.clone(),
        store.clone(),
        SweepConfig {
            max_cancellations: rules.max_cancellations,
        },
    ));

    let dispatcher = Arc::new(NotificationDispatcher::new(
        store.clone(),
        Arc::new(AllowAllPreferences),
        Arc::new(PlainTicketRenderer),
        Arc::new(LogTransport),
        DispatcherConfig {
            batch_size: rules.notification_batch_size,
            max_retries: rules.notification_max_retries,
        },
    ));

    let adjuster = Arc::new(PricingAdjuster::new(
        store.clone(),
        PriceSchedule::default(),
        chrono::Duration::hours(rules.pricing_window_hours),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Sweep cadence follows the configured hold timeout.
    let sweep_every = Duration::from_secs(rules.timeout_minutes.max(1) as u64 * 60);
    let mut workers = Vec::new();
    workers.push(tokio::spawn(run_periodic(
        sweeper.clone(),
        sweep_every,
        shutdown_rx.clone(),
    )));
    workers.push(tokio::spawn(run_periodic(
        dispatcher,
        Duration::from_secs(rules.notification_poll_seconds),
        shutdown_rx.clone(),
    )));
    workers.push(tokio::spawn(run_periodic(
        adjuster,
        Duration::from_secs(rules.pricing_interval_hours * 3600),
        shutdown_rx,
    )));

    let app_state = AppState {
        engine,
        sweeper,
        reservations: store.clone(),
        settings: store,
    };
    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");

    // Stop background tasks and let in-flight batches finish.
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }
}
