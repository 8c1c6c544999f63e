//! HTTP API application wiring.
//!
//! - `services.rs`: store selection and typed repositories
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request bodies and record decoding helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/api/v1", routes::router())
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(middleware::actor_middleware))
                .layer(Extension(services)),
        )
}
