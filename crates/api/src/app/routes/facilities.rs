//! Dining rooms, reached through their facility.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    routing::{delete, post},
};
use serde_json::Value;

use seniorcare_core::{EntityId, Projection};
use seniorcare_entities::{DiningRoom, Facility};

use crate::app::dto::{decode_record, parse_id};
use crate::app::errors::{self, repository_error_to_response};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/facilities/:id/dining-rooms", post(add_dining_room))
        .route("/dining-rooms/:id", delete(delete_dining_room))
}

async fn add_dining_room(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let facility_id: EntityId = match parse_id(&id, "facility") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<Facility>().get(facility_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return errors::not_found("facility"),
        Err(e) => return repository_error_to_response(e),
    }
    let room: DiningRoom = match decode_record(
        body,
        &[
            ("id", EntityId::new().to_string()),
            ("facility_id", facility_id.to_string()),
        ],
    ) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<DiningRoom>().add(actor.user_id(), room).await {
        Ok(saved) => common::created(saved.project("detail")),
        Err(e) => repository_error_to_response(e),
    }
}

async fn delete_dining_room(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: EntityId = match parse_id(&id, "dining room") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<DiningRoom>().remove(id).await {
        Ok(outcome) => common::deleted(id, &outcome),
        Err(e) => repository_error_to_response(e),
    }
}
