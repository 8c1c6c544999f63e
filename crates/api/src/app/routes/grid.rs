//! Grid descriptors and grid pages.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;

use seniorcare_core::SpaceId;
use seniorcare_entities::registry;
use seniorcare_infra::{GridQuery, Store};

use crate::app::dto::{GridOptionsQuery, parse_id};
use crate::app::errors::{self, store_error_to_response};
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new().route("/:entity/options", get(options))
}

/// Column descriptors of one view.
async fn options(
    Path(entity): Path<String>,
    Query(query): Query<GridOptionsQuery>,
) -> axum::response::Response {
    let view_name = query.view.as_deref().unwrap_or("list");
    match registry::grid_view(&entity, view_name) {
        Some(view) => Json(json!({
            "entity": entity,
            "view": view.name,
            "columns": view.columns,
        }))
        .into_response(),
        None => errors::json_error(
            axum::http::StatusCode::NOT_FOUND,
            "unknown_view",
            format!("no grid view '{view_name}' for '{entity}'"),
        ),
    }
}

/// One page of a grid, scoped to the space in the path.
pub async fn page(
    Extension(services): Extension<Arc<AppServices>>,
    Path((space_id, entity)): Path<(String, String)>,
    Json(query): Json<GridQuery>,
) -> axum::response::Response {
    let space: SpaceId = match parse_id(&space_id, "space") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let Some(view) = registry::grid_view(&entity, &query.view) else {
        return errors::json_error(
            axum::http::StatusCode::NOT_FOUND,
            "unknown_view",
            format!("no grid view '{}' for '{entity}'", query.view),
        );
    };
    match services.store().grid(&view, &query, Some(space)).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => store_error_to_response(e),
    }
}
