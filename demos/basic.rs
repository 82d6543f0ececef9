//! Basic example showing how to use sea-orm-otel.
//!
//! Run with: cargo run --example basic

use opentelemetry::KeyValue;
use sea_orm::{ConnectOptions, ConnectionTrait};
use sea_orm_otel::prelude::*;
use sea_orm_otel::SeaOrmConnector;
use tracing::Instrument;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sea_orm_otel=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "postgres://localhost/test".into());

    let config = TracingConfig::development()
        .with_attribute(KeyValue::new("db.system", "postgresql"))
        .with_database_name("test");

    // Option 1: one call
    // let db = sea_orm_otel::connect(database_url.as_str(), config).await?;

    // Option 2: wrap a connector, e.g. to keep it around for reconnects
    let connector = SeaOrmConnector::new(ConnectOptions::new(database_url)).traced(config);

    // Connect inside a request-like span so the connect span has a parent.
    let db = connector
        .connect()
        .instrument(tracing::info_span!("startup"))
        .await?;

    tracing::info!("Database connection established with tracing enabled");

    db.ping().await?;
    db.execute_unprepared("SELECT 1").await?;

    // You can also access the inner connection if needed
    let _inner = db.inner();

    Ok(())
}
