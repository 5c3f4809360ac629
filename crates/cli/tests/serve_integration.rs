//! Integration tests for the `boletin serve` HTTP API.
//!
//! Each test starts the server as a child process on a unique port,
//! makes HTTP requests, and verifies the responses.

use std::io::Read;
use std::net::TcpStream;
use std::process::{Child, Command};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

/// Atomic port counter to avoid port conflicts between parallel tests.
/// Base port is derived from process ID so parallel `cargo test --workspace` runs
/// (which spawn separate test binaries) don't collide on the same port range.
static NEXT_PORT: AtomicU16 = AtomicU16::new(0);
static PORT_INIT: std::sync::Once = std::sync::Once::new();

fn next_port() -> u16 {
    PORT_INIT.call_once(|| {
        let base = 20000 + (std::process::id() as u16 % 20000);
        NEXT_PORT.store(base, Ordering::SeqCst);
    });
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

/// Helper: start the boletin serve process on the given port.
fn start_server(port: u16) -> Child {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_boletin"));
    cmd.arg("serve").arg("--port").arg(port.to_string());
    // Redirect stdout/stderr to avoid blocking
    cmd.stdout(std::process::Stdio::piped());
    cmd.stderr(std::process::Stdio::piped());

    let child = cmd.spawn().expect("failed to start boletin serve");
    // Wait for server to be ready by polling the port
    for _ in 0..50 {
        if TcpStream::connect(format!("127.0.0.1:{}", port)).is_ok() {
            return child;
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    child
}

/// Helper: make a simple HTTP request and return (status, body).
fn http_request(port: u16, method: &str, path: &str, body: Option<&str>) -> (u16, String) {
    let mut stream = TcpStream::connect(format!("127.0.0.1:{}", port)).expect("failed to connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(10)))
        .unwrap();

    let request = match body {
        Some(b) => format!(
            "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            method, path, port, b.len(), b
        ),
        None => format!(
            "{} {} HTTP/1.1\r\nHost: localhost:{}\r\nConnection: close\r\n\r\n",
            method, path, port
        ),
    };
    std::io::Write::write_all(&mut stream, request.as_bytes()).expect("failed to write");

    let mut response = String::new();
    let _ = stream.read_to_string(&mut response);

    parse_http_response(&response)
}

fn http_get(port: u16, path: &str) -> (u16, String) {
    http_request(port, "GET", path, None)
}

fn http_post(port: u16, path: &str, body: &str) -> (u16, String) {
    http_request(port, "POST", path, Some(body))
}

fn http_put(port: u16, path: &str, body: &str) -> (u16, String) {
    http_request(port, "PUT", path, Some(body))
}

/// Parse an HTTP response into (status_code, body).
fn parse_http_response(response: &str) -> (u16, String) {
    let parts: Vec<&str> = response.splitn(2, "\r\n\r\n").collect();
    let headers = parts.first().unwrap_or(&"").to_string();
    let body = parts.get(1).unwrap_or(&"").to_string();

    let status_line = headers.lines().next().unwrap_or("");
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(0);

    // Handle chunked transfer encoding
    let body = if headers.contains("Transfer-Encoding: chunked") {
        decode_chunked(&body)
    } else {
        body
    };

    (status, body)
}

/// Decode chunked transfer encoding.
fn decode_chunked(data: &str) -> String {
    let mut result = String::new();
    let mut remaining = data;

    while let Some(line_end) = remaining.find("\r\n") {
        let size_str = &remaining[..line_end];
        let size = match usize::from_str_radix(size_str.trim(), 16) {
            Ok(s) => s,
            Err(_) => break,
        };
        if size == 0 {
            break;
        }
        let chunk_start = line_end + 2;
        let chunk_end = chunk_start + size;
        if chunk_end > remaining.len() {
            // Partial chunk, take what we have
            result.push_str(&remaining[chunk_start..]);
            break;
        }
        result.push_str(&remaining[chunk_start..chunk_end]);
        // Skip past chunk data + \r\n
        remaining = if chunk_end + 2 <= remaining.len() {
            &remaining[chunk_end + 2..]
        } else {
            ""
        };
    }

    result
}

/// A valid document creation payload.
fn draft_body(special_number: &str, publication_date: &str) -> String {
    serde_json::json!({
        "type": "DECREE",
        "special_number": special_number,
        "publication_date": publication_date,
        "reference": "EXP-2026-000123",
        "content": "Decreto de prueba",
        "keywords": ["prueba"],
        "legal_status": "VIGENTE"
    })
    .to_string()
}

/// Create a document and return its id.
fn create_document(port: u16) -> String {
    let (status, body) = http_post(port, "/documents", &draft_body("123/2026", "2026-03-01"));
    assert_eq!(status, 201, "create should return 201, body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], true);
    json["data"]["id"]
        .as_str()
        .expect("document id")
        .to_string()
}

#[test]
fn health_returns_200_with_version() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/health");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["status"], "ok");
    assert!(
        json.get("version").is_some(),
        "version field must be present"
    );
}

#[test]
fn transitions_endpoint_lists_targets() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/workflow/transitions/APPROVED");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["state"], "APPROVED");
    let allowed = json["data"]["allowed"].as_array().expect("allowed array");
    let allowed: Vec<&str> = allowed.iter().filter_map(|v| v.as_str()).collect();
    assert_eq!(allowed, vec!["PUBLISHED", "REVIEW"]);
}

#[test]
fn transitions_endpoint_unknown_state_returns_400() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/workflow/transitions/PENDING");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], false);
}

#[test]
fn create_document_starts_in_draft() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_post(port, "/documents", &draft_body("45/2026", "2026-02-10"));
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 201, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["state"], "DRAFT");
    let history = json["data"]["history"].as_array().expect("history array");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["from_state"], serde_json::Value::Null);
    assert_eq!(history[0]["to_state"], "DRAFT");
}

#[test]
fn create_document_with_bad_type_returns_400() {
    let port = next_port();
    let mut child = start_server(port);

    let body = r#"{"type": "MEMO", "special_number": "1/2026", "publication_date": "2026-01-01", "reference": "R", "content": "C"}"#;
    let (status, resp) = http_post(port, "/documents", body);
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400, "body: {}", resp);
    let json: serde_json::Value = serde_json::from_str(&resp).expect("valid JSON");
    assert_eq!(json["success"], false);
}

#[test]
fn transition_draft_to_review() {
    let port = next_port();
    let mut child = start_server(port);

    let id = create_document(port);
    let (status, body) = http_post(
        port,
        &format!("/documents/{}/transition", id),
        r#"{"to_state": "REVIEW", "notes": "listo"}"#,
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["data"]["state"], "REVIEW");
    let history = json["data"]["history"].as_array().expect("history array");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1]["from_state"], "DRAFT");
    assert_eq!(history[1]["to_state"], "REVIEW");
    assert_eq!(history[1]["notes"], "listo");
}

#[test]
fn invalid_transition_returns_400_naming_both_states() {
    let port = next_port();
    let mut child = start_server(port);

    let id = create_document(port);
    let (status, body) = http_post(
        port,
        &format!("/documents/{}/transition", id),
        r#"{"to_state": "PUBLISHED"}"#,
    );

    // Document must be untouched afterwards
    let (get_status, get_body) = http_get(port, &format!("/documents/{}", id));
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 400, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], false);
    let message = json["message"].as_str().expect("message string");
    assert!(message.contains("DRAFT"), "message: {}", message);
    assert!(message.contains("PUBLISHED"), "message: {}", message);

    assert_eq!(get_status, 200);
    let doc: serde_json::Value = serde_json::from_str(&get_body).expect("valid JSON");
    assert_eq!(doc["data"]["state"], "DRAFT");
    assert_eq!(doc["data"]["history"].as_array().unwrap().len(), 1);
}

#[test]
fn transition_unknown_document_returns_404() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_post(
        port,
        "/documents/nonexistent/transition",
        r#"{"to_state": "REVIEW"}"#,
    );
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["success"], false);
}

#[test]
fn full_lifecycle_over_http() {
    let port = next_port();
    let mut child = start_server(port);

    let id = create_document(port);
    let path = ["REVIEW", "APPROVED", "PUBLISHED", "ARCHIVED"];
    for to in path {
        let (status, body) = http_post(
            port,
            &format!("/documents/{}/transition", id),
            &format!(r#"{{"to_state": "{}"}}"#, to),
        );
        assert_eq!(status, 200, "transition to {} failed, body: {}", to, body);
    }

    let (status, body) = http_get(port, &format!("/documents/{}/history", id));
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    let history = json["data"].as_array().expect("history array");
    assert_eq!(history.len(), 5);
    // Chain: each entry's to_state is the next entry's from_state
    for pair in history.windows(2) {
        assert_eq!(pair[0]["to_state"], pair[1]["from_state"]);
    }
    assert_eq!(history[4]["to_state"], "ARCHIVED");
}

#[test]
fn list_documents_filters_by_state() {
    let port = next_port();
    let mut child = start_server(port);

    let id = create_document(port);
    let (status, _) = http_post(
        port,
        &format!("/documents/{}/transition", id),
        r#"{"to_state": "REVIEW"}"#,
    );
    assert_eq!(status, 200);
    // Second document stays in DRAFT
    let (status, _) = http_post(port, "/documents", &draft_body("99/2026", "2026-05-01"));
    assert_eq!(status, 201);

    let (status, body) = http_get(port, "/documents?state=REVIEW");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["data"]["count"], 1);
    let docs = json["data"]["documents"].as_array().expect("documents");
    assert_eq!(docs[0]["id"], serde_json::Value::String(id));
    assert_eq!(docs[0]["state"], "REVIEW");
}

#[test]
fn update_fields_keeps_state_and_history() {
    let port = next_port();
    let mut child = start_server(port);

    let id = create_document(port);
    let update = serde_json::json!({
        "type": "DECREE",
        "special_number": "123-bis/2026",
        "publication_date": "2026-03-02",
        "reference": "EXP-2026-000123",
        "content": "Decreto corregido",
        "keywords": ["prueba"],
        "file_url": "https://files.example/123.pdf",
        "legal_status": "PARCIAL"
    })
    .to_string();
    let (status, body) = http_put(port, &format!("/documents/{}", id), &update);
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 200, "body: {}", body);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["data"]["state"], "DRAFT");
    assert_eq!(json["data"]["special_number"], "123-bis/2026");
    assert_eq!(json["data"]["legal_status"], "PARCIAL");
    assert_eq!(json["data"]["history"].as_array().unwrap().len(), 1);
}

#[test]
fn not_found_returns_404() {
    let port = next_port();
    let mut child = start_server(port);

    let (status, body) = http_get(port, "/nonexistent");
    child.kill().ok();
    child.wait().ok();

    assert_eq!(status, 404);
    let json: serde_json::Value = serde_json::from_str(&body).expect("valid JSON");
    assert_eq!(json["message"], "not found");
}
