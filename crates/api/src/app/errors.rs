use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};

use seniorcare_core::DomainError;
use seniorcare_infra::{GridError, RepositoryError, StoreError};

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}

pub fn not_found(what: &str) -> axum::response::Response {
    json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found"))
}

pub fn repository_error_to_response(err: RepositoryError) -> axum::response::Response {
    match err {
        RepositoryError::Validation(errors) => json_error_with_details(
            StatusCode::BAD_REQUEST,
            "validation_error",
            errors.to_string(),
            serde_json::to_value(&errors).unwrap_or(Value::Null),
        ),
        RepositoryError::Domain(e) => domain_error_to_response(e),
        RepositoryError::Store(e) => store_error_to_response(e),
    }
}

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        DomainError::Validation(_) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::InvalidId(_) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::InvariantViolation(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", message)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", message),
        DomainError::Conflict(_) => json_error(StatusCode::CONFLICT, "conflict", message),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        StoreError::UniqueViolation {
            table,
            constraint,
            columns,
        } => {
            tracing::warn!(%table, %constraint, "unique constraint rejected write");
            json_error_with_details(
                StatusCode::CONFLICT,
                "unique_violation",
                message,
                json!({ "constraint": constraint, "columns": columns }),
            )
        }
        StoreError::ForeignKeyViolation { table, column, .. } => {
            tracing::warn!(%table, %column, "foreign key rejected write");
            json_error_with_details(
                StatusCode::UNPROCESSABLE_ENTITY,
                "foreign_key_violation",
                message,
                json!({ "column": column }),
            )
        }
        StoreError::NotFound { .. } => json_error(StatusCode::NOT_FOUND, "not_found", message),
        StoreError::Mapping(_) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_record", message)
        }
        StoreError::Grid(e) => grid_error_to_response(e),
        StoreError::UnknownTable(_) | StoreError::Database(_) => {
            tracing::error!(error = %message, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn grid_error_to_response(err: GridError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        GridError::UnknownView(_) => json_error(StatusCode::NOT_FOUND, "unknown_view", message),
        GridError::MalformedView { .. } => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "malformed_view", message)
        }
        _ => json_error(StatusCode::BAD_REQUEST, "invalid_grid_query", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seniorcare_core::ValidationErrors;

    #[test]
    fn status_codes() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "This value should not be blank.");
        assert_eq!(
            repository_error_to_response(RepositoryError::Validation(errors)).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            store_error_to_response(StoreError::UniqueViolation {
                table: "tbl_allergen".into(),
                constraint: "uq_allergen_space_id_title".into(),
                columns: vec!["space_id".into(), "title".into()],
            })
            .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            domain_error_to_response(DomainError::invariant("end before start")).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            grid_error_to_response(GridError::NotSortable("resident".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
