use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::HeaderName;
use axum::http::Method;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::store::postgres::PgSpinStore;
use crate::wheel::SpinLedger;

mod auth;
mod error;
mod logging;
mod services;
mod store;
mod wheel;

#[derive(Clone)]
pub struct AppState {
    ledger: SpinLedger,
}

pub async fn health_check() -> impl IntoResponse {
    Response::builder().status(200).body(Body::from("OK")).unwrap()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::setup();
    dotenvy::from_path(".env").ok();

    // Fail at startup, not per request, when the auth secret is absent.
    std::env::var("JWT_SECRET_KEY").expect("JWT_SECRET_KEY must be set");

    let pool = PgPool::connect_with(
        std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set")
            .parse::<sqlx::postgres::PgConnectOptions>()?
            .to_owned(),
    )
    .await
    .expect("Failed to create pool");

    sqlx::migrate!().run(&pool).await?;

    let state = AppState {
        ledger: SpinLedger::new(Arc::new(PgSpinStore::new(pool))),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
        ]);

    let app = Router::new()
        .route("/api/health_check", get(health_check))
        .nest("/api/wheel", services::spin_service::create_router())
        .layer(cors)
        .with_state(state);

    let addr: SocketAddr = std::env::var("BIND_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
        .parse()?;
    info!("listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
