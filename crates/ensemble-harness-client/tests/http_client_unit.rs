// crates/ensemble-harness-client/tests/http_client_unit.rs
// ============================================================================
// Module: HTTP Client Unit Tests
// Description: Wire-level checks for the HTTP resource API.
// Purpose: Verify request paths, bodies, credentials, and response mapping.
// ============================================================================

//! ## Overview
//! Each test binds a `tiny_http` server on `127.0.0.1:0`, scripts its
//! responses, and inspects what the client sent:
//! - create and clone bodies and paths
//! - credential query parameters and location handling
//! - rejected responses, size limits, and transport failures

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::sync::mpsc;
use std::thread;

use ensemble_harness_client::HttpResourceApi;
use ensemble_harness_config::ApiConfig;
use ensemble_harness_core::ApiError;
use ensemble_harness_core::ResourceApi;
use ensemble_harness_core::ResourceId;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Test Helpers
// ============================================================================

/// Request observed by the scripted server.
struct Seen {
    method: String,
    url: String,
    body: Value,
}

/// Scripted response: status, body, optional `Location` header.
type Scripted = (u16, String, Option<String>);

/// Serves the scripted responses in order and reports each request.
fn scripted_server(
    responses: Vec<Scripted>,
) -> (String, mpsc::Receiver<Seen>, thread::JoinHandle<()>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();
    let handle = thread::spawn(move || {
        for (status, body, location) in responses {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let mut raw = String::new();
            let _ = request.as_reader().read_to_string(&mut raw);
            let _ = tx.send(Seen {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body: serde_json::from_str(&raw).unwrap_or(Value::Null),
            });
            let mut response = Response::from_string(body).with_status_code(status);
            if let Some(location) = location {
                response = response.with_header(Header::from_bytes("Location", location).unwrap());
            }
            let _ = request.respond(response);
        }
    });
    (format!("http://{addr}/andromeda"), rx, handle)
}

fn config(base_url: String) -> ApiConfig {
    ApiConfig {
        base_url,
        allow_http: true,
        ..ApiConfig::default()
    }
}

fn args(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

// ============================================================================
// SECTION: Create and Clone
// ============================================================================

#[test]
fn create_ensemble_posts_dataset_and_args() {
    let body = json!({"resource": "ensemble/e1", "status": {"code": 1}}).to_string();
    let (base, seen, handle) = scripted_server(vec![(
        201,
        body,
        Some("https://example.test/andromeda/ensemble/e1".to_string()),
    )]);
    let api = HttpResourceApi::new(&config(base)).unwrap();

    let envelope = api
        .create_ensemble(&ResourceId::new("dataset/d1"), &args(json!({"number_of_models": 2})))
        .unwrap();

    handle.join().unwrap();
    let request = seen.recv().unwrap();
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/andromeda/ensemble");
    assert_eq!(request.body, json!({"dataset": "dataset/d1", "number_of_models": 2}));
    assert_eq!(envelope.code, 201);
    assert_eq!(envelope.resource, Some(ResourceId::new("ensemble/e1")));
    assert_eq!(envelope.location.as_deref(), Some("https://example.test/andromeda/ensemble/e1"));
}

#[test]
fn clone_posts_origin_and_configured_project() {
    let body = json!({"resource": "ensemble/e2", "origin": "ensemble/e1"}).to_string();
    let (base, seen, handle) = scripted_server(vec![(201, body, None)]);
    let api = HttpResourceApi::new(&ApiConfig {
        project: Some("project/p1".to_string()),
        ..config(base)
    })
    .unwrap();

    let envelope = api.clone_ensemble(&ResourceId::new("ensemble/e1"), &Map::new()).unwrap();

    handle.join().unwrap();
    let request = seen.recv().unwrap();
    assert_eq!(request.body, json!({"origin": "ensemble/e1", "project": "project/p1"}));
    assert_eq!(envelope.origin(), Some(ResourceId::new("ensemble/e1")));
    assert!(envelope.location.unwrap().ends_with("/andromeda/ensemble/e2"));
}

#[test]
fn explicit_project_argument_wins_over_config() {
    let body = json!({"resource": "ensemble/e3"}).to_string();
    let (base, seen, handle) = scripted_server(vec![(201, body, None)]);
    let api = HttpResourceApi::new(&ApiConfig {
        project: Some("project/default".to_string()),
        ..config(base)
    })
    .unwrap();

    api.clone_ensemble(&ResourceId::new("ensemble/e1"), &args(json!({"project": "project/p9"})))
        .unwrap();

    handle.join().unwrap();
    assert_eq!(seen.recv().unwrap().body["project"], "project/p9");
}

#[test]
fn clone_rejects_non_ensemble_ids() {
    let api = HttpResourceApi::new(&config("http://127.0.0.1:9/".to_string())).unwrap();
    let err = api.clone_ensemble(&ResourceId::new("model/m1"), &Map::new()).unwrap_err();
    assert!(matches!(err, ApiError::Invalid(_)));
}

// ============================================================================
// SECTION: Reads and Credentials
// ============================================================================

#[test]
fn get_resource_sends_credentials_but_location_omits_them() {
    let body = json!({"resource": "ensemble/e1", "status": {"code": 5}}).to_string();
    let (base, seen, handle) = scripted_server(vec![(200, body, None)]);
    let api = HttpResourceApi::new(&ApiConfig {
        username: Some("alice".to_string()),
        api_key: Some("secret".to_string()),
        ..config(base)
    })
    .unwrap();

    let envelope = api.get_resource(&ResourceId::new("ensemble/e1")).unwrap();

    handle.join().unwrap();
    let request = seen.recv().unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.url, "/andromeda/ensemble/e1?username=alice&api_key=secret");
    let location = envelope.location.clone().unwrap();
    assert!(!location.contains("api_key"));
    assert_eq!(envelope.status().code, 5);
}

#[test]
fn rejected_response_becomes_envelope() {
    let body = json!({"code": 402, "status": {"message": "quota exceeded"}}).to_string();
    let (base, _seen, handle) = scripted_server(vec![(402, body, None)]);
    let api = HttpResourceApi::new(&config(base)).unwrap();

    let envelope = api.create_ensemble(&ResourceId::new("dataset/d1"), &Map::new()).unwrap();

    handle.join().unwrap();
    assert_eq!(envelope.code, 402);
    assert!(envelope.resource.is_none());
    assert_eq!(envelope.error.unwrap()["status"]["message"], "quota exceeded");
}

#[test]
fn non_json_error_body_is_kept_as_message() {
    let (base, _seen, handle) = scripted_server(vec![(502, "bad gateway".to_string(), None)]);
    let api = HttpResourceApi::new(&config(base)).unwrap();

    let envelope = api.get_resource(&ResourceId::new("ensemble/e1")).unwrap();

    handle.join().unwrap();
    assert_eq!(envelope.code, 502);
    assert_eq!(envelope.error.unwrap()["status"]["message"], "bad gateway");
}

#[test]
fn success_without_resource_id_is_decode_error() {
    let (base, _seen, handle) = scripted_server(vec![(200, "{}".to_string(), None)]);
    let api = HttpResourceApi::new(&config(base)).unwrap();

    let err = api.get_resource(&ResourceId::new("ensemble/e1")).unwrap_err();

    handle.join().unwrap();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[test]
fn oversized_response_fails_closed() {
    let body = json!({"resource": "ensemble/e1", "padding": "x".repeat(512)}).to_string();
    let (base, _seen, handle) = scripted_server(vec![(200, body, None)]);
    let api = HttpResourceApi::new(&config(base)).unwrap().with_max_response_bytes(64);

    let err = api.get_resource(&ResourceId::new("ensemble/e1")).unwrap_err();

    handle.join().unwrap();
    assert!(err.to_string().contains("size limit"));
}

#[test]
fn unreachable_server_is_transport_error() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    drop(server);
    let api = HttpResourceApi::new(&config(format!("http://{addr}/"))).unwrap();

    let err = api.get_resource(&ResourceId::new("ensemble/e1")).unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
}

#[test]
fn base_url_gains_trailing_slash() {
    let api = HttpResourceApi::new(&config("http://127.0.0.1:9/andromeda".to_string())).unwrap();
    assert_eq!(api.base_url().as_str(), "http://127.0.0.1:9/andromeda/");
}
