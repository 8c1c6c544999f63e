use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use seniorcare_core::UserId;

use crate::app::errors::json_error;
use crate::context::ActorContext;

pub const ACTOR_HEADER: &str = "x-user-id";

pub async fn actor_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let actor = match extract_actor(req.headers()) {
        Ok(actor) => actor,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, "invalid_actor", message),
    };
    req.extensions_mut().insert(ActorContext::new(actor));
    next.run(req).await
}

fn extract_actor(headers: &HeaderMap) -> Result<Option<UserId>, String> {
    let Some(header) = headers.get(ACTOR_HEADER) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| format!("{ACTOR_HEADER} is not valid text"))?
        .trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<UserId>()
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn missing_or_blank_header_is_anonymous() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_actor(&headers), Ok(None));
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("  "));
        assert_eq!(extract_actor(&headers), Ok(None));
    }

    #[test]
    fn parses_user_id() {
        let id = UserId::new();
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(extract_actor(&headers), Ok(Some(id)));
    }

    #[test]
    fn rejects_garbage() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_HEADER, HeaderValue::from_static("admin"));
        assert!(extract_actor(&headers).is_err());
    }
}
