use std::str::FromStr;

use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use seniorcare_core::{Record, Row};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ChangeStateRequest {
    pub state: i16,
}

#[derive(Debug, Default, Deserialize)]
pub struct GridOptionsQuery {
    pub view: Option<String>,
}

/// Columns clients may never write directly.
const SERVER_OWNED: [&str; 4] = ["created_by", "updated_by", "created_at", "updated_at"];

/// Decode a JSON body into a record, with `fixed` values (ids, parent
/// references from the path) taking precedence over the body.
pub fn decode_record<R: Record>(
    body: Value,
    fixed: &[(&str, String)],
) -> Result<R, axum::response::Response> {
    let Value::Object(mut row) = body else {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            "request body must be a JSON object",
        ));
    };
    for column in SERVER_OWNED {
        row.remove(column);
    }
    for (column, value) in fixed {
        row.insert((*column).to_string(), Value::String(value.clone()));
    }
    R::from_row(row).map_err(errors::domain_error_to_response)
}

/// The stored row of `entity` with the body's changes laid over it.
pub fn merge_row<R: Record>(entity: &R, body: Value) -> Result<Value, axum::response::Response> {
    let Value::Object(changes) = body else {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_body",
            "request body must be a JSON object",
        ));
    };
    let mut row: Row = entity.to_row().map_err(errors::domain_error_to_response)?;
    for (key, value) in changes {
        row.insert(key, value);
    }
    Ok(Value::Object(row))
}

pub fn parse_id<T: FromStr>(raw: &str, what: &'static str) -> Result<T, axum::response::Response> {
    raw.parse().map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::SpaceId;
    use seniorcare_entities::Allergen;
    use serde_json::json;

    #[test]
    fn fixed_values_and_server_columns_win() {
        let space = SpaceId::new();
        let allergen: Allergen = decode_record(
            json!({
                "title": "Peanuts",
                "space_id": SpaceId::new().to_string(),
                "created_at": "1999-01-01T00:00:00Z",
            }),
            &[
                ("id", seniorcare_core::EntityId::new().to_string()),
                ("space_id", space.to_string()),
            ],
        )
        .unwrap();
        assert_eq!(allergen.space_id, space);
        assert_eq!(allergen.audit.created_at, None);
    }

    #[test]
    fn non_object_body_is_rejected() {
        let res = decode_record::<Allergen>(json!([1, 2]), &[]).unwrap_err();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn merge_keeps_unchanged_fields() {
        let allergen = Allergen::new(SpaceId::new(), "Dust");
        let merged = merge_row(&allergen, json!({ "description": "Indoor" })).unwrap();
        assert_eq!(merged["title"], "Dust");
        assert_eq!(merged["description"], "Indoor");
    }
}
