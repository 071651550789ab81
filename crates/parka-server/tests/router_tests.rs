// Dweve Parka - Typed Command Server
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end router tests through `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use parka_core::Command;
use parka_params::StaticOverrides;
use parka_server::{demo, router, AppState, CommandRegistry, ServerConfig};
use parka_test::fixtures;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tower::ServiceExt;

fn demo_app() -> Router {
    let registry = demo::registry()
        .unwrap()
        .with(Command::Rows(Arc::new(fixtures::RaggedCommand::new())))
        .unwrap()
        .with(Command::Writer(Arc::new(fixtures::EchoWriter::new(["one", "two"]).failing())))
        .unwrap();
    router(AppState::new(registry))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(body.to_vec()).unwrap())
}

fn error_of(body: &str) -> JsonValue {
    let parsed: JsonValue = serde_json::from_str(body).unwrap();
    parsed["error"].clone()
}

// ==================== Parameter errors ====================

#[tokio::test]
async fn test_invalid_choice_is_rejected_before_running() {
    let (command, numbers) = fixtures::numbers_command();
    let app = router(AppState::new(CommandRegistry::new().with(command).unwrap()));

    let (status, _, body) = send(app, get("/data/numbers?choice=bogus")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_of(&body);
    assert_eq!(error["code"], "invalid_value");
    assert_eq!(error["parameter"], "choice");
    assert!(error["message"].as_str().unwrap().contains("bogus"));
    assert_eq!(numbers.runs(), 0);
}

#[tokio::test]
async fn test_invalid_json_list_element() {
    let touch = Arc::new(fixtures::CountingBare::new(fixtures::sample_layers()));
    let app = router(AppState::new(
        CommandRegistry::new().with(Command::Bare(touch.clone())).unwrap(),
    ));

    let (status, _, body) = send(app, post_json("/data/touch", json!({ "tags": ["x"] }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body)["parameter"], "tags");
    assert_eq!(touch.runs(), 0);
}

#[tokio::test]
async fn test_missing_required_parameter() {
    let (status, _, body) = send(demo_app(), get("/data/inspect-config")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = error_of(&body);
    assert_eq!(error["code"], "missing_parameter");
    assert_eq!(error["parameter"], "config");
}

#[tokio::test]
async fn test_static_override_schema_violation_is_server_error() {
    let overrides = StaticOverrides::new().set("db", "hostname", "db.internal");
    let app = router(AppState::new(demo::registry().unwrap()).with_static_overrides(Arc::new(overrides)));

    let (status, _, body) = send(app, get("/data/params")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_of(&body)["code"], "schema_violation");
}

#[tokio::test]
async fn test_static_overrides_beat_request_values() {
    let overrides = StaticOverrides::new().set("db", "host", "db.internal");
    let app = router(AppState::new(demo::registry().unwrap()).with_static_overrides(Arc::new(overrides)));

    let (status, _, body) = send(app, get("/data/params?host=elsewhere")).await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<JsonValue> = serde_json::from_str(&body).unwrap();
    let host = rows.iter().find(|r| r["name"] == "host").unwrap();
    assert_eq!(host["value"], "db.internal");
    assert_eq!(host["source"], "static");
}

#[tokio::test]
async fn test_unknown_command_is_404() {
    let (status, _, body) = send(demo_app(), get("/data/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body)["code"], "unknown_command");
}

// ==================== Data routes ====================

#[tokio::test]
async fn test_data_defaults_to_json() {
    let (status, headers, body) = send(demo_app(), get("/data/numbers?count=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    let rows: Vec<JsonValue> = serde_json::from_str(&body).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2]["square"], 9);
}

#[tokio::test]
async fn test_data_csv() {
    let (status, headers, body) = send(demo_app(), get("/data/numbers?count=2&_format=csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv"));
    assert_eq!(body, "n,square,even\n1,1,false\n2,4,true\n");
}

#[tokio::test]
async fn test_data_rejects_unknown_format() {
    let (status, _, body) = send(demo_app(), get("/data/numbers?_format=xml")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body)["code"], "unknown_format");
}

#[tokio::test]
async fn test_data_post_form() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/data/numbers")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("count=4"))
        .unwrap();
    let (status, _, body) = send(demo_app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let rows: Vec<JsonValue> = serde_json::from_str(&body).unwrap();
    assert_eq!(rows.len(), 4);
}

#[tokio::test]
async fn test_secrets_are_masked_in_echo() {
    let (_, _, body) = send(demo_app(), post_json("/data/params", json!({ "password": "hunter2" }))).await;
    assert!(!body.contains("hunter2"));
    let rows: Vec<JsonValue> = serde_json::from_str(&body).unwrap();
    let password = rows.iter().find(|r| r["name"] == "password").unwrap();
    assert_eq!(password["source"], "json");
}

#[tokio::test]
async fn test_upload_parses_config_file() {
    let body = "--XYZ\r\n\
        Content-Disposition: form-data; name=\"config\"; filename=\"app.yaml\"\r\n\r\n\
        name: parka\nport: 8080\n\r\n\
        --XYZ--\r\n";
    let req = Request::builder()
        .method(Method::POST)
        .uri("/data/inspect-config?_format=csv")
        .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
        .body(Body::from(body))
        .unwrap();
    let (status, _, body) = send(demo_app(), req).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body, "key,kind,value\nname,string,parka\nport,integer,8080\n");
}

#[tokio::test]
async fn test_failure_before_output_is_an_error_response() {
    let (status, _, body) = send(demo_app(), get("/data/numbers?fail_after=0")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let error = error_of(&body);
    assert_eq!(error["code"], "execution_failed");
    assert!(error["message"].as_str().unwrap().contains("gave up after 0 rows"));
}

#[tokio::test]
async fn test_late_json_failure_truncates_body() {
    let response = demo_app()
        .oneshot(get("/data/numbers?count=5&fail_after=2"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.into_body().collect().await.is_err());
}

// ==================== Streaming, text and pages ====================

#[tokio::test]
async fn test_streaming_events() {
    let (status, headers, body) = send(demo_app(), get("/streaming/numbers?count=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(body.matches("data: ").count(), 2);
}

#[tokio::test]
async fn test_streaming_late_failure_is_an_event() {
    let (status, _, body) = send(demo_app(), get("/streaming/numbers?count=5&fail_after=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("data: {\"n\"").count(), 2);
    assert!(body.ends_with("event: error\ndata: {\"error\":\"gave up after 2 rows\"}\n\n"));
}

#[tokio::test]
async fn test_text_for_writer_and_rows() {
    let (status, _, body) = send(demo_app(), get("/text/greet?name=parka&times=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Hello, parka!\nHello, parka!\n");

    let (_, headers, body) = send(demo_app(), get("/text/numbers?count=2")).await;
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));
    assert!(body.contains("square"));
}

#[tokio::test]
async fn test_writer_failure_after_output_appends_trailer() {
    let (status, _, body) = send(demo_app(), get("/text/echo")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "one\ntwo\n\nerror: command failed: writer failed\n");
}

#[tokio::test]
async fn test_bare_command_answers_ok() {
    let (status, _, body) = send(demo_app(), get("/data/touch?target=cache")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<JsonValue>(&body).unwrap(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_streaming_rejects_writer() {
    let (status, _, body) = send(demo_app(), get("/streaming/greet")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(&body)["code"], "wrong_command_kind");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_html_page() {
    let (status, headers, body) = send(demo_app(), get("/html/numbers?count=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/html"));
    assert_eq!(body.matches("<tr><td>").count(), 2);
    assert!(body.contains("<th>square</th>"));
    assert!(body.contains(r#"name="count""#));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_html_late_failure_shows_panel() {
    let (status, _, body) = send(demo_app(), get("/html/numbers?count=5&fail_after=2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("<tr><td>").count(), 2);
    assert!(body.contains("gave up after 2 rows"));
}

#[tokio::test]
async fn test_unknown_page_template_is_rejected_before_running() {
    let (command, numbers) = fixtures::numbers_command();
    let app = router(AppState::new(CommandRegistry::new().with(command).unwrap()));

    let (status, _, body) = send(app, get("/html/numbers?_template=nope.html")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_of(&body)["code"], "unknown_template");
    assert_eq!(numbers.runs(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_datatables_page() {
    let (status, _, body) = send(demo_app(), get("/datatables/ragged")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"var columns = ["a","b"];"#));
}

#[tokio::test]
async fn test_index_lists_commands() {
    let (status, _, body) = send(demo_app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(r#"href="/html/numbers""#));
    assert!(body.contains(r#"href="/text/greet""#));
}

// ==================== Downloads ====================

#[tokio::test]
async fn test_download_uses_union_of_columns() {
    let (status, headers, body) = send(demo_app(), get("/download/ragged.csv")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"ragged.csv\""
    );
    assert_eq!(headers[header::CONTENT_LENGTH], body.len().to_string().as_str());
    assert_eq!(body, "a,b,c\n1,2,\n,3,4\n5,,\n");
}

#[tokio::test]
async fn test_download_needs_known_extension() {
    let (status, _, _) = send(demo_app(), get("/download/ragged.xlsx")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _, _) = send(demo_app(), get("/download/ragged")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ==================== API ====================

#[tokio::test]
async fn test_api_commands() {
    let (status, _, body) = send(demo_app(), get("/api/commands")).await;
    assert_eq!(status, StatusCode::OK);
    let commands: Vec<JsonValue> = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> = commands.iter().filter_map(|c| c["name"].as_str()).collect();
    assert!(names.contains(&"numbers"));
    assert!(names.contains(&"greet"));
}

#[tokio::test]
async fn test_template_reload_picks_up_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        template_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let app = router(AppState::from_config(&config, demo::registry().unwrap()).unwrap());

    std::fs::write(
        dir.path().join("index.html"),
        "{% for c in commands %}{{ c.name }};{% endfor %}",
    )
    .unwrap();
    let (status, _, body) = send(
        app.clone(),
        Request::builder()
            .method(Method::POST)
            .uri("/api/templates/reload")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reloaded: JsonValue = serde_json::from_str(&body).unwrap();
    assert_eq!(reloaded["templates"], 1);

    let (_, _, body) = send(app, get("/")).await;
    assert_eq!(body, "numbers;params;inspect-config;greet;touch;");
}

#[tokio::test]
async fn test_health() {
    let (status, _, body) = send(demo_app(), get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("ok"));
}
