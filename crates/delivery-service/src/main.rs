use std::sync::Arc;

use rc_common::config::ServiceMode;
use rc_common::event_bus::kafka::KafkaEventBus;
use rc_common::event_bus::EventBus;
use rc_common::inbox::SqlInbox;
use rc_common::{db, outbox, Config};

use delivery_service::http::{self, AppState};
use delivery_service::repository::PostgresDeliveryRepository;
use delivery_service::{consumer, migrations, DeliveryApplication};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = Config::from_env("delivery-service")?;
    let pool = db::create_pool(&config.database).await?;

    if config.service_mode == ServiceMode::Init {
        db::run_migrations(&pool, migrations::MIGRATIONS).await?;
        tracing::info!("migrations applied, exiting (SERVICE_MODE=INIT)");
        return Ok(());
    }

    let bus: Arc<dyn EventBus> = Arc::new(KafkaEventBus::new(&config.broker.bootstrap_servers())?);
    let inbox = Arc::new(SqlInbox::new(pool.clone()));
    let repository = Arc::new(PostgresDeliveryRepository::new(pool.clone()));
    let app = Arc::new(DeliveryApplication::new(pool.clone(), repository.clone(), bus.clone()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let outbox_task = tokio::spawn(outbox::run(
        pool.clone(),
        bus.clone(),
        std::time::Duration::from_millis(config.outbox_poll_interval_ms),
        config.outbox_batch_size,
        shutdown_rx.clone(),
    ));

    let consumer_task = tokio::spawn(consumer::run(
        pool.clone(),
        bus,
        inbox,
        app.clone(),
        config.consumer_group.clone(),
        shutdown_rx,
    ));

    let http_app = http::router(AppState { app, repository });
    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("delivery-service listening on 0.0.0.0:8080");

    let server = axum::serve(listener, http_app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    server.await?;
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(outbox_task, consumer_task);

    Ok(())
}
