use std::sync::Arc;

use reqwest::StatusCode;
use serde_json::{Value, json};

use seniorcare_api::app::{AppServices, build_app};

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, over a fresh in-memory store and an ephemeral port.
        let app = build_app(Arc::new(AppServices::in_memory()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn put(&self, path: &str, body: Value) -> (StatusCode, Value) {
        let res = self.client.put(self.url(path)).json(&body).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.get(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    async fn delete(&self, path: &str) -> (StatusCode, Value) {
        let res = self.client.delete(self.url(path)).send().await.unwrap();
        let status = res.status();
        (status, res.json().await.unwrap_or(Value::Null))
    }

    /// Create a space and return its id.
    async fn space(&self, name: &str) -> String {
        let (status, body) = self.post("/spaces", json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }

    async fn create(&self, path: &str, body: Value) -> String {
        let (status, created) = self.post(path, body).await;
        assert_eq!(status, StatusCode::CREATED, "POST {path}: {created}");
        created["id"].as_str().unwrap().to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(format!("{}/health", srv.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_actor_header_is_rejected() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .post(srv.url("/spaces"))
        .header("x-user-id", "admin")
        .json(&json!({ "name": "Sunrise" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_actor");
}

#[tokio::test]
async fn catalog_titles_are_normalized_and_unique_per_space() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;
    let other = srv.space("Sunset").await;

    let (status, body) = srv
        .post(&format!("/spaces/{space}/allergens"), json!({ "title": "Tree   nuts" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["title"], "Tree nuts");

    let (status, body) = srv
        .post(&format!("/spaces/{space}/allergens"), json!({ "title": "Tree nuts" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"]["title"][0], "This value is already used.");

    let (status, _) = srv
        .post(&format!("/spaces/{other}/allergens"), json!({ "title": "Tree nuts" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, listed) = srv.get(&format!("/spaces/{space}/allergens")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn blank_role_title_fails_validation() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;
    let (status, body) = srv
        .post(
            &format!("/spaces/{space}/responsible-person-roles"),
            json!({ "title": "  " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["title"].is_array());
}

#[tokio::test]
async fn records_are_invisible_from_other_spaces() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;
    let other = srv.space("Sunset").await;
    let id = srv
        .create(&format!("/spaces/{space}/medications"), json!({ "title": "Aspirin" }))
        .await;

    let (status, _) = srv.get(&format!("/spaces/{other}/medications/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = srv.delete(&format!("/spaces/{other}/medications/{id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = srv
        .put(
            &format!("/spaces/{space}/medications/{id}"),
            json!({ "title": "Aspirin  100mg" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Aspirin 100mg");
}

#[tokio::test]
async fn contract_lifecycle_cascades_and_nulls() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;

    let facility = srv
        .create(
            &format!("/spaces/{space}/facilities"),
            json!({ "name": "Sunrise Manor", "shorthand": "SRM", "beds_licensed": 40, "beds_target": 36 }),
        )
        .await;
    let dining_room = srv
        .create(
            &format!("/facilities/{facility}/dining-rooms"),
            json!({ "title": "Main hall" }),
        )
        .await;
    let care_level = srv
        .create(&format!("/spaces/{space}/care-levels"), json!({ "title": "Assisted" }))
        .await;
    let resident = srv
        .create(
            &format!("/spaces/{space}/residents"),
            json!({ "first_name": "Anna", "last_name": "Petrosyan", "birthday": "1940-02-03", "gender": 2 }),
        )
        .await;
    let contract = srv
        .create(
            "/contracts",
            json!({ "resident_id": resident, "contract_type": 1, "start": "2024-01-01" }),
        )
        .await;

    // dining room is required when the option is created
    let (status, body) = srv
        .post(
            &format!("/contracts/{contract}/facility-options"),
            json!({ "care_level_id": care_level }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["details"]["dining_room_id"].is_array());

    let (status, option) = srv
        .post(
            &format!("/contracts/{contract}/facility-options"),
            json!({ "dining_room_id": dining_room, "care_level_id": care_level, "dnr": true }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{option}");
    assert_eq!(option["state"], 1);
    let option_id = option["id"].as_str().unwrap().to_string();

    let (status, deleted) = srv.delete(&format!("/dining-rooms/{dining_room}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["nulled"][0]["table"], "tbl_contract_facility_option");
    assert_eq!(deleted["nulled"][0]["column"], "dining_room_id");

    let (status, option) = srv.get(&format!("/contract-facility-options/{option_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(option["dining_room_id"], Value::Null);
    assert_eq!(option["care_level_id"], care_level.as_str());

    let (status, option) = srv
        .put(
            &format!("/contract-facility-options/{option_id}/state"),
            json!({ "state": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{option}");
    assert_eq!(option["state"], 2);

    // losing the care level must not block a later state change
    let (status, deleted) = srv
        .delete(&format!("/spaces/{space}/care-levels/{care_level}"))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["nulled"][0]["column"], "care_level_id");
    let (status, option) = srv
        .put(
            &format!("/contract-facility-options/{option_id}/state"),
            json!({ "state": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{option}");
    assert_eq!(option["state"], 3);
    assert_eq!(option["care_level_id"], Value::Null);

    let (status, _) = srv
        .put(
            &format!("/contract-facility-options/{option_id}/state"),
            json!({ "state": 9 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deleted) = srv.delete(&format!("/contracts/{contract}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["cascaded"][0]["id"], option_id.as_str());

    let (status, _) = srv.get(&format!("/contract-facility-options/{option_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn options_only_attach_to_facility_contracts() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;
    let resident = srv
        .create(
            &format!("/spaces/{space}/residents"),
            json!({ "first_name": "Aram", "last_name": "Hakobyan", "birthday": "1936-11-20", "gender": 1 }),
        )
        .await;
    let contract = srv
        .create(
            "/contracts",
            json!({ "resident_id": resident, "contract_type": 2, "start": "2024-03-01" }),
        )
        .await;
    let (status, body) = srv
        .post(&format!("/contracts/{contract}/facility-options"), json!({}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invariant_violation");
}

#[tokio::test]
async fn contract_for_unknown_resident_is_rejected() {
    let srv = TestServer::spawn().await;
    let (status, body) = srv
        .post(
            "/contracts",
            json!({
                "resident_id": "0190a7f0-0000-7000-8000-000000000000",
                "contract_type": 1,
                "start": "2024-01-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "foreign_key_violation");
}

#[tokio::test]
async fn grid_options_and_pages() {
    let srv = TestServer::spawn().await;
    let space = srv.space("Sunrise").await;
    for title in ["Shellfish", "Peanuts", "Pollen"] {
        srv.create(&format!("/spaces/{space}/allergens"), json!({ "title": title }))
            .await;
    }

    let (status, options) = srv.get("/grid/allergen/options").await;
    assert_eq!(status, StatusCode::OK);
    let keys: Vec<&str> = options["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"title"));

    let (status, _) = srv.get("/grid/allergen/options?view=missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, page) = srv.post(&format!("/spaces/{space}/grid/allergen"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{page}");
    assert_eq!(page["total"], 3);
    let titles: Vec<&str> = page["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Peanuts", "Pollen", "Shellfish"]);

    let (status, page) = srv
        .post(
            &format!("/spaces/{space}/grid/allergen"),
            json!({
                "filters": [{ "key": "title", "op": "like", "value": "po" }],
                "pagination": { "limit": 1, "offset": 0 },
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["rows"][0]["title"], "Pollen");
    assert_eq!(page["has_more"], false);

    let (status, body) = srv
        .post(
            &format!("/spaces/{space}/grid/allergen"),
            json!({ "sort": [{ "key": "nope" }] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_grid_query");
}
