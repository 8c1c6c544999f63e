//! Generic CRUD for records owned directly by a space.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
};
use serde_json::Value;

use seniorcare_core::{
    Audited, EntityId, Operations, Projection, Record, SpaceId, SpaceScoped, Validate,
};

use crate::app::dto::{decode_record, merge_row, parse_id};
use crate::app::errors::{self, repository_error_to_response};
use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::context::ActorContext;

/// Records listed, created and edited under `/spaces/{space_id}/...`.
pub trait SpaceResource:
    Record + Validate + Operations + Audited + Projection + SpaceScoped
{
}

impl<T> SpaceResource for T where
    T: Record + Validate + Operations + Audited + Projection + SpaceScoped
{
}

pub fn router<R: SpaceResource>() -> Router {
    Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/:id", get(fetch::<R>).put(update::<R>).delete(remove::<R>))
}

fn parse_path(space_id: &str, id: &str) -> Result<(SpaceId, EntityId), axum::response::Response> {
    Ok((parse_id(space_id, "space")?, parse_id(id, "record")?))
}

/// Load a record, hiding rows that belong to another space.
async fn load_scoped<R: SpaceResource>(
    services: &AppServices,
    space: SpaceId,
    id: EntityId,
) -> Result<R, axum::response::Response> {
    match services.repo::<R>().get(id).await {
        Ok(Some(entity)) if entity.space_id() == space => Ok(entity),
        Ok(_) => Err(errors::not_found(R::TABLE)),
        Err(e) => Err(repository_error_to_response(e)),
    }
}

async fn list<R: SpaceResource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path(space_id): Path<String>,
) -> axum::response::Response {
    let space: SpaceId = match parse_id(&space_id, "space") {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<R>().list(Some(space)).await {
        Ok(items) => {
            let body: Vec<Value> = items.iter().map(|item| item.project("list")).collect();
            Json(body).into_response()
        }
        Err(e) => repository_error_to_response(e),
    }
}

async fn create<R: SpaceResource>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(space_id): Path<String>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let space: SpaceId = match parse_id(&space_id, "space") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let entity: R = match decode_record(
        body,
        &[
            ("id", EntityId::new().to_string()),
            ("space_id", space.to_string()),
        ],
    ) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<R>().add(actor.user_id(), entity).await {
        Ok(saved) => common::created(saved.project("detail")),
        Err(e) => repository_error_to_response(e),
    }
}

async fn fetch<R: SpaceResource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path((space_id, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (space, id) = match parse_path(&space_id, &id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match load_scoped::<R>(&services, space, id).await {
        Ok(entity) => Json(entity.project("detail")).into_response(),
        Err(res) => res,
    }
}

async fn update<R: SpaceResource>(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path((space_id, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> axum::response::Response {
    let (space, id) = match parse_path(&space_id, &id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let existing = match load_scoped::<R>(&services, space, id).await {
        Ok(v) => v,
        Err(res) => return res,
    };
    let entity: R = match merge_row(&existing, body).and_then(|row| {
        decode_record(
            row,
            &[("id", id.to_string()), ("space_id", space.to_string())],
        )
    }) {
        Ok(v) => v,
        Err(res) => return res,
    };
    match services.repo::<R>().edit(actor.user_id(), entity).await {
        Ok(saved) => Json(saved.project("detail")).into_response(),
        Err(e) => repository_error_to_response(e),
    }
}

async fn remove<R: SpaceResource>(
    Extension(services): Extension<Arc<AppServices>>,
    Path((space_id, id)): Path<(String, String)>,
) -> axum::response::Response {
    let (space, id) = match parse_path(&space_id, &id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    if let Err(res) = load_scoped::<R>(&services, space, id).await {
        return res;
    }
    match services.repo::<R>().remove(id).await {
        Ok(outcome) => common::deleted(id, &outcome),
        Err(e) => repository_error_to_response(e),
    }
}
