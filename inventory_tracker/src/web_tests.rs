//! Tests for the JSON API router.

use super::*;
use crate::storage::MemoryStorage;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request};
use serde_json::{json, Value};
use skylander_common::CatalogItem;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn seeded_store() -> SharedStore {
    let mut store = InventoryStore::open(MemoryStorage::new()).unwrap();
    store
        .import_catalog(vec![
            CatalogItem::new("1", "Eruptor").with_element("Fire"),
            CatalogItem::new("2", "Flameslinger").with_element("Fire"),
            CatalogItem::new("3", "Gill Grunt").with_element("Water"),
        ])
        .unwrap();
    store.update_field("1", FieldUpdate::Have(true)).unwrap();
    store.update_field("1", FieldUpdate::ForTrade(true)).unwrap();
    store.update_field("1", FieldUpdate::Count(2)).unwrap();
    store.update_field("1", FieldUpdate::Value(3.5)).unwrap();
    shared_store(store)
}

fn router(store: SharedStore) -> Router {
    create_router(store, WebConfig::default())
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

// ── Dashboard and items ──────────────────────────────────────────────

#[tokio::test]
async fn stats_endpoint() {
    let (status, body) = get_json(router(seeded_store()), "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["total"], json!(3));
    assert_eq!(body["data"]["have"], json!(1));
    assert_eq!(body["data"]["forTrade"], json!(1));
    assert_eq!(body["data"]["totalValue"], json!(7.0));
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn elements_endpoint_is_sorted_and_unique() {
    let (_, body) = get_json(router(seeded_store()), "/api/elements").await;
    assert_eq!(body["data"], json!(["Fire", "Water"]));
}

#[tokio::test]
async fn items_endpoint_applies_query_filter() {
    let (status, body) = get_json(
        router(seeded_store()),
        "/api/items?element=Fire&sort=name&direction=desc",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["item"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Flameslinger", "Eruptor"]);
}

#[tokio::test]
async fn unknown_item_is_404() {
    let (status, body) = get_json(router(seeded_store()), "/api/items/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn update_item_field() {
    let store = seeded_store();
    let (status, body) = send(
        router(store.clone()),
        Method::POST,
        "/api/items/3",
        Some(json!({"field": "need", "value": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["record"]["need"], json!(true));
    assert!(store.lock().unwrap().record("3").need);
}

#[tokio::test]
async fn update_with_invalid_value_is_400() {
    let store = seeded_store();
    let (status, body) = send(
        router(store.clone()),
        Method::POST,
        "/api/items/1",
        Some(json!({"field": "count", "value": -4})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert_eq!(store.lock().unwrap().record("1").count, 2);
}

#[tokio::test]
async fn update_unknown_field_is_400() {
    let (status, _) = send(
        router(seeded_store()),
        Method::POST,
        "/api/items/1",
        Some(json!({"field": "currency", "value": "EUR"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn add_endpoint_increments_count() {
    let store = seeded_store();
    send(router(store.clone()), Method::POST, "/api/items/3/add", None).await;
    let (_, body) = send(router(store), Method::POST, "/api/items/3/add", None).await;

    assert_eq!(body["data"]["id"], json!("3"));
    assert_eq!(body["data"]["record"]["have"], json!(true));
    assert_eq!(body["data"]["record"]["count"], json!(2));
}

#[tokio::test]
async fn reset_endpoint_zeroes_everything() {
    let (status, body) = send(router(seeded_store()), Method::POST, "/api/reset", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["have"], json!(0));
    assert_eq!(body["data"]["totalValue"], json!(0.0));
}

#[tokio::test]
async fn failed_save_is_reported_as_warning() {
    let store = InventoryStore::open(MemoryStorage::with_quota(1)).unwrap();
    let (status, body) = send(router(shared_store(store)), Method::POST, "/api/items/x/add", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["record"]["count"], json!(1));
    assert!(body["warning"].as_str().is_some());
}

// ── Trade list ───────────────────────────────────────────────────────

#[tokio::test]
async fn trade_endpoint_returns_items_total_and_text() {
    let (_, body) = get_json(router(seeded_store()), "/api/trade?element=Fire").await;

    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["totalValue"], json!(7.0));
    assert_eq!(
        body["data"]["text"],
        json!("Skylanders Available for Trade:\n\nEruptor (Fire) - 2 available - Value: 3.50 each\n\nContact me to discuss trades!")
    );
}

// ── Imports ──────────────────────────────────────────────────────────

#[tokio::test]
async fn import_csv_body() {
    let store = seeded_store();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/import/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("id,name,element\n1,Eruptor,Fire\n9,Pop Fizz,Magic\n"))
        .unwrap();

    let response = router(store.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let store = store.lock().unwrap();
    assert_eq!(store.catalog().len(), 2);
    assert_eq!(store.record("1").count, 2);
    assert_eq!(store.record("9").count, 0);
}

#[tokio::test]
async fn import_csv_save_failure_reports_real_counts() {
    let store = InventoryStore::open(MemoryStorage::with_quota(1)).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/import/csv")
        .body(Body::from("id,name\n1,Eruptor\n2,Bash\n1,Eruptor Again\n"))
        .unwrap();

    let response = router(shared_store(store)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["data"]["items"], json!(2));
    assert_eq!(body["data"]["newRecords"], json!(2));
    assert_eq!(body["data"]["duplicatesDropped"], json!(1));
    assert!(body["warning"].as_str().unwrap().contains("Failed to save"));
}

#[tokio::test]
async fn import_csv_without_valid_rows_is_400() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/import/csv")
        .body(Body::from("id,element\n1,Fire\n"))
        .unwrap();

    let response = router(seeded_store()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn import_sheet_fetches_export() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/abc123/export"))
        .respond_with(ResponseTemplate::new(200).set_body_string("name,element\nTrigger Happy,Tech\n"))
        .mount(&mock_server)
        .await;

    let store = seeded_store();
    let config = WebConfig {
        sheets_base_url: mock_server.uri(),
        ..WebConfig::default()
    };
    let (status, body) = send(
        create_router(store.clone(), config),
        Method::POST,
        "/api/import/sheet",
        Some(json!({"url": "https://docs.google.com/spreadsheets/d/abc123/edit"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["items"], json!(1));
    assert_eq!(store.lock().unwrap().catalog()[0].id, "skylander-0");
}

#[tokio::test]
async fn import_sheet_rejects_bad_url() {
    let (status, body) = send(
        router(seeded_store()),
        Method::POST,
        "/api/import/sheet",
        Some(json!({"url": "https://example.com/list.csv"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Google Sheets"));
}

#[tokio::test]
async fn import_sheet_http_error_is_bad_gateway() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&mock_server)
        .await;

    let config = WebConfig {
        sheets_base_url: mock_server.uri(),
        ..WebConfig::default()
    };
    let (status, _) = send(
        create_router(seeded_store(), config),
        Method::POST,
        "/api/import/sheet",
        Some(json!({"url": "spreadsheets/d/private"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn sheet_import_overtaken_by_reset_is_discarded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/spreadsheets/d/slow/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("name,element\nTrigger Happy,Tech\n")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let store = seeded_store();
    let config = WebConfig {
        sheets_base_url: mock_server.uri(),
        ..WebConfig::default()
    };
    let app = create_router(store.clone(), config);

    let pending = tokio::spawn(send(
        app.clone(),
        Method::POST,
        "/api/import/sheet",
        Some(json!({"url": "spreadsheets/d/slow"})),
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, _) = send(app, Method::POST, "/api/reset", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = pending.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));

    let store = store.lock().unwrap();
    let ids: Vec<&str> = store.catalog().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[tokio::test]
async fn sheet_import_overtaken_by_csv_import_is_discarded() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("name,element\nTrigger Happy,Tech\n")
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let store = seeded_store();
    let config = WebConfig {
        sheets_base_url: mock_server.uri(),
        ..WebConfig::default()
    };
    let app = create_router(store.clone(), config);

    let pending = tokio::spawn(send(
        app.clone(),
        Method::POST,
        "/api/import/sheet",
        Some(json!({"url": "spreadsheets/d/slow"})),
    ));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/import/csv")
        .body(Body::from("id,name,element\n9,Pop Fizz,Magic\n"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = pending.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);

    let store = store.lock().unwrap();
    assert_eq!(store.catalog().len(), 1);
    assert_eq!(store.catalog()[0].name, "Pop Fizz");
}

// ── Sharing ──────────────────────────────────────────────────────────

#[tokio::test]
async fn share_endpoint_builds_payload_and_link() {
    let (status, body) = send(
        router(seeded_store()),
        Method::POST,
        "/api/share",
        Some(json!({"title": "Fire", "selectedIds": ["1", "missing"]})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let items = body["data"]["payload"]["skylanders"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0]["value"].is_null());
    assert_eq!(body["data"]["payload"]["description"], json!("Check out my Skylanders collection!"));
    assert!(body["data"]["link"]
        .as_str()
        .unwrap()
        .starts_with("https://skylander-inventory.example.com/shared/"));
}

#[tokio::test]
async fn saved_views_lifecycle() {
    let store = seeded_store();

    let (status, body) = send(
        router(store.clone()),
        Method::POST,
        "/api/views",
        Some(json!({"title": "Traders", "showValues": true, "selectedIds": ["1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = get_json(router(store.clone()), "/api/views").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (_, body) = get_json(router(store.clone()), &format!("/api/views/{}/share", id)).await;
    assert_eq!(body["data"]["payload"]["skylanders"][0]["value"], json!(3.5));

    let uri = format!("/api/views/{}", id);
    let (status, _) = send(router(store.clone()), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(router(store), Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
}

// ── Plumbing ─────────────────────────────────────────────────────────

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/reset")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn default_router_sends_no_cors_headers() {
    let response = router(seeded_store())
        .oneshot(preflight("https://evil.example"))
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn configured_origin_is_the_only_one_allowed() {
    let config = WebConfig {
        allowed_origin: Some(parse_origin("http://localhost:5173").unwrap()),
        ..WebConfig::default()
    };
    let app = create_router(seeded_store(), config);

    let response = app.clone().oneshot(preflight("http://localhost:5173")).await.unwrap();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:5173"
    );

    let response = app.oneshot(preflight("https://evil.example")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[test]
fn wildcard_origin_is_refused() {
    assert!(parse_origin("*").is_err());
    assert!(parse_origin("  ").is_err());
    assert_eq!(parse_origin(" http://localhost:3000 ").unwrap(), "http://localhost:3000");
}

#[test]
fn test_api_response_serialization() {
    let response = ApiResponse::ok(vec![1, 2, 3]);

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":true"));
    assert!(json.contains("\"data\":[1,2,3]"));
    assert!(!json.contains("\"warning\""));
}

#[test]
fn test_api_error_serialization() {
    let response: ApiResponse<()> = ApiResponse {
        success: false,
        data: None,
        error: Some("Test error".to_string()),
        warning: None,
    };

    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"success\":false"));
    assert!(json.contains("\"error\":\"Test error\""));
    // data should be omitted when None
    assert!(!json.contains("\"data\""));
}
