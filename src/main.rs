use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod airdata;
mod classify;
mod clock;
mod config;
mod fetch;
mod limiter;
mod resolver;
mod routes;

use airdata::openweather::AirDataApi;
use clock::SystemClock;
use config::Config;
use fetch::{FetchClient, HttpTransport};
use limiter::{RateLimiter, SqliteBudgetStore};
use resolver::Resolver;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "airwatch_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Durable store for the daily call budget
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./airwatch.db".to_string());
    let pool = sqlx::SqlitePool::connect(&database_url).await?;
    let budget_store = Arc::new(SqliteBudgetStore::new(pool));
    budget_store.init_table().await?;

    let clock = Arc::new(SystemClock);
    let limiter = Arc::new(RateLimiter::new(budget_store, clock.clone()));
    let fetch = Arc::new(FetchClient::new(
        Arc::new(HttpTransport::new()),
        limiter,
        clock.clone(),
    ));
    let resolver = Arc::new(Resolver::new(fetch, AirDataApi::new(config), clock));

    let state = AppState { resolver };

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("Server starting on http://0.0.0.0:8080");

    axum::serve(listener, app).await?;

    Ok(())
}
