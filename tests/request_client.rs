mod common;

use common::{closed_port_url, serve, Canned};
use finbot_client::*;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::json;

fn client_for(base_url: &str) -> RequestClient {
    let config = ClientConfig {
        base_url: Some(base_url.to_string()),
        ..ClientConfig::default()
    };
    RequestClient::new(&config).unwrap()
}

#[tokio::test]
async fn get_decodes_json_and_skips_csrf() {
    let server = serve(|_| Canned::json(200, json!({"vendors": [], "total_count": 0}))).await;
    let client = client_for(&server.base_url);
    client.meta_token().set("page-token");

    let success = client.get("/vendor/api/v1/vendors/me").await.unwrap();
    assert_eq!(success.status_code, 200);
    assert_eq!(success.data, ResponseBody::Json(json!({"vendors": [], "total_count": 0})));

    let request = &server.requests()[0];
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/vendor/api/v1/vendors/me");
    assert_eq!(request.header("accept"), Some("application/json"));
    assert_eq!(request.header("x-csrf-token"), None);
}

#[tokio::test]
async fn post_sends_json_with_meta_token() {
    let server = serve(|_| Canned::json(200, json!({"success": true}))).await;
    let client = client_for(&server.base_url);
    client.meta_token().set("page-token");

    let body = json!({"invoice_number": "INV-1", "amount": 120.5, "description": "Stunt coordination"});
    client.post("/vendor/api/v1/invoices", &body).await.unwrap();

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.header("content-type"), Some("application/json"));
    assert_eq!(request.header("x-csrf-token"), Some("page-token"));
    assert_eq!(request.json(), body);
}

#[tokio::test]
async fn cookie_token_is_read_fresh_on_each_request() {
    let server = serve(|req| match req.path.as_str() {
        "/login" => Canned::json(200, json!({})).header("set-cookie", "csrf_token=first; Path=/"),
        "/rotate" => Canned::json(200, json!({})).header("set-cookie", "csrf_token=second; Path=/"),
        _ => Canned::json(200, json!({"ok": true})),
    })
    .await;
    let client = client_for(&server.base_url);

    client.delete("/vendor/api/v1/vendors/1").await.unwrap();
    client.get("/login").await.unwrap();
    client.put("/vendor/api/v1/profile", &json!({})).await.unwrap();
    client.get("/rotate").await.unwrap();
    client.delete("/vendor/api/v1/vendors/2").await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].header("x-csrf-token"), None);
    assert_eq!(requests[2].header("x-csrf-token"), Some("first"));
    assert_eq!(requests[4].header("x-csrf-token"), Some("second"));
    assert!(requests[4].header("cookie").unwrap().contains("csrf_token=second"));
}

#[tokio::test]
async fn caller_headers_override_defaults_on_the_wire() {
    let server = serve(|_| Canned::raw(200, "text/plain", b"accepted")).await;
    let client = client_for(&server.base_url);
    client.meta_token().set("page-token");

    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("text/plain"));
    headers.insert("x-request-id", HeaderValue::from_static("abc"));
    let success = client
        .request("/notes", Method::POST, headers, RequestBody::Text("hello".to_string()))
        .await
        .unwrap();

    assert_eq!(success.data, ResponseBody::Text("accepted".to_string()));
    let request = &server.requests()[0];
    assert_eq!(request.header("accept"), Some("text/plain"));
    assert_eq!(request.header("x-request-id"), Some("abc"));
    assert_eq!(request.header("x-csrf-token"), Some("page-token"));
    assert_eq!(request.body, b"hello");
}

#[tokio::test]
async fn validation_failure_carries_payload_message() {
    let server = serve(|_| {
        Canned::json(
            422,
            json!({"error": {"code": 422, "message": "Validation Error", "type": "validation_error", "details": []}}),
        )
    })
    .await;
    let client = client_for(&server.base_url);

    let failure = client
        .post("/vendor/api/v1/vendors/register", &json!({}))
        .await
        .unwrap_err();
    assert_eq!(failure.status_code, 422);
    assert_eq!(failure.message, "Validation Error");
    assert!(failure.is_validation_error());
    assert!(matches!(failure.payload, Some(ResponseBody::Json(_))));
}

#[tokio::test]
async fn html_error_page_gets_status_line_message() {
    let server = serve(|_| Canned::raw(500, "text/html", b"<h1>Error 500</h1>")).await;
    let client = client_for(&server.base_url);

    let failure = client.get("/work").await.unwrap_err();
    assert_eq!(failure.message, "HTTP 500: Internal Server Error");
    assert!(failure.is_server_error());
    assert_eq!(
        failure.payload,
        Some(ResponseBody::Text("<h1>Error 500</h1>".to_string()))
    );
}

#[tokio::test]
async fn csrf_rejection_is_auth_failure() {
    let server = serve(|_| {
        Canned::json(
            403,
            json!({"error": {"code": 403, "message": "CSRF token validation failed", "type": "csrf_error", "details": "CSRF token missing from request"}}),
        )
    })
    .await;
    let client = client_for(&server.base_url);

    let failure = client.post("/vendor/api/v1/invoices", &json!({})).await.unwrap_err();
    assert!(failure.is_auth_error());
    assert!(failure.is_csrf_error());
    assert_eq!(failure.message, "CSRF token validation failed");
}

#[tokio::test]
async fn malformed_json_is_status_zero() {
    let server = serve(|_| Canned::raw(200, "application/json", b"{\"broken\":")).await;
    let client = client_for(&server.base_url);

    let failure = client.get("/vendor/api/v1/dashboard/metrics").await.unwrap_err();
    assert_eq!(failure.status_code, 0);
    assert!(failure.is_network_error());
    assert!(failure.payload.is_none());
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let client = client_for(&closed_port_url().await);

    let failure = client.get("/api/health").await.unwrap_err();
    assert_eq!(failure.status_code, 0);
    assert!(failure.payload.is_none());
    assert!(!failure.message.is_empty());
    assert_eq!(failure.category(), ErrorCategory::NetworkError);
}

#[tokio::test]
async fn upload_leaves_boundary_to_transport() {
    let server = serve(|_| Canned::json(200, json!({"uploaded": true}))).await;
    let client = client_for(&server.base_url);
    client.meta_token().set("page-token");

    let form = Form::new()
        .text("description", "W-9")
        .part("file", Part::bytes(b"%PDF-1.4".to_vec()).file_name("w9.pdf"));
    client.upload("/vendor/api/v1/documents", form).await.unwrap();

    let request = &server.requests()[0];
    let content_type = request.header("content-type").unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(request.header("x-csrf-token"), Some("page-token"));
    assert!(String::from_utf8_lossy(&request.body).contains("filename=\"w9.pdf\""));
}

#[tokio::test]
async fn download_hands_back_raw_bytes() {
    let payload: Vec<u8> = vec![0x00, 0xff, 0xfe, 0x10, 0x80];
    let bytes = payload.clone();
    let server = serve(move |_| {
        Canned::raw(200, "application/octet-stream", &bytes)
            .header("content-disposition", "attachment; filename=\"statement.bin\"")
    })
    .await;
    let client = client_for(&server.base_url);

    let download = client.download("/uploads/statement.bin").await.unwrap();
    assert_eq!(download.bytes.as_ref(), payload.as_slice());
    assert_eq!(download.filename.as_deref(), Some("statement.bin"));
    assert_eq!(download.content_type.as_deref(), Some("application/octet-stream"));
    assert_eq!(server.requests()[0].header("accept"), Some("*/*"));
}

#[tokio::test]
async fn download_of_json_file_is_not_decoded() {
    let server = serve(|_| Canned::raw(200, "application/json", b"{not really json")).await;
    let client = client_for(&server.base_url);

    let download = client.download("/uploads/export.json").await.unwrap();
    assert_eq!(download.bytes.as_ref(), b"{not really json");
}

#[tokio::test]
async fn missing_download_is_a_failure() {
    let server = serve(|_| Canned::json(404, json!({"detail": "File not found"}))).await;
    let client = client_for(&server.base_url);

    let failure = client.download("/uploads/missing.pdf").await.unwrap_err();
    assert_eq!(failure.status_code, 404);
    assert_eq!(failure.message, "File not found");
    assert_eq!(failure.category(), ErrorCategory::Other);
}

#[tokio::test]
async fn identical_concurrent_requests_are_not_coalesced() {
    let server = serve(|_| Canned::json(200, json!({"success": true}))).await;
    let client = client_for(&server.base_url);
    let body = json!({"vendor_id": 7});

    let calls = (0..3).map(|_| client.post("/vendor/api/v1/vendors/switch/7", &body));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn seeded_session_cookie_is_sent() {
    let server = serve(|_| Canned::json(200, json!({"vendors": []}))).await;
    let client = client_for(&server.base_url);
    client.set_session("abc123");

    client.get("/vendor/api/v1/vendors/me").await.unwrap();

    let cookie = server.requests()[0].header("cookie").map(str::to_string);
    assert_eq!(cookie.as_deref(), Some("finbot_session=abc123"));
}

#[tokio::test]
async fn blank_payload_message_falls_back_to_status_line() {
    let server = serve(|_| Canned::json(400, json!({"message": ""}))).await;
    let client = client_for(&server.base_url);

    let failure = client.post("/vendor/api/v1/invoices", &json!({})).await.unwrap_err();
    assert_eq!(failure.message, "HTTP 400: Bad Request");
}
