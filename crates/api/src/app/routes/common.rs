//! Helpers shared by route handlers.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

use seniorcare_core::EntityId;
use seniorcare_infra::DeleteOutcome;

/// Body returned by every delete endpoint.
pub fn deleted(id: EntityId, outcome: &DeleteOutcome) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({
            "id": id.to_string(),
            "cascaded": outcome.cascaded,
            "nulled": outcome.nulled,
        })),
    )
        .into_response()
}

pub fn created(body: serde_json::Value) -> axum::response::Response {
    (StatusCode::CREATED, Json(body)).into_response()
}
