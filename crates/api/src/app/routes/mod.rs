use axum::{Router, routing::post};

pub mod common;
pub mod contracts;
pub mod facilities;
pub mod grid;
pub mod resources;
pub mod spaces;
pub mod system;

/// Router for everything under `/api/v1`.
pub fn router() -> Router {
    Router::new()
        .route("/spaces", post(spaces::create))
        .nest("/spaces/:space_id", spaces::scoped_router())
        .nest("/grid", grid::router())
        .merge(contracts::router())
        .merge(facilities::router())
}
