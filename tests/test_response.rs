use mirror_relay::http::response::{Response, ResponseBuilder, StatusCode, CORS_HEADERS};
use mirror_relay::http::writer::serialize_response;
use serde_json::{json, Value};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::BadGateway.as_u16(), 502);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::NoContent.reason_phrase(), "No Content");
    assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    assert_eq!(StatusCode::BadGateway.reason_phrase(), "Bad Gateway");
}

#[test]
fn test_response_builder_auto_content_length() {
    let body = b"{\"version\":\"1\"}".to_vec();
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body(body.clone())
        .build();

    let content_length = response.headers.get("Content-Length").unwrap();
    assert_eq!(content_length, &body.len().to_string());
}

#[test]
fn test_response_builder_preserves_explicit_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Length", "3")
        .body(b"abc".to_vec())
        .build();

    assert_eq!(response.headers.get("Content-Length").unwrap(), "3");
}

#[test]
fn test_json_response_has_cors_and_content_type() {
    let response = Response::json(StatusCode::Ok, &json!({"version": "1"}));

    assert_eq!(response.header("content-type"), Some("application/json"));
    for (key, value) in CORS_HEADERS {
        assert_eq!(response.header(key), Some(value));
    }
    let body: Value = serde_json::from_slice(&response.body).unwrap();
    assert_eq!(body, json!({"version": "1"}));
}

#[test]
fn test_json_error_body() {
    let response = Response::json_error(StatusCode::NotFound, "not_found");

    assert_eq!(response.status, StatusCode::NotFound);
    assert_eq!(response.body, br#"{"error":"not_found"}"#.to_vec());
}

#[test]
fn test_preflight_is_empty_without_content_length() {
    let response = Response::preflight();

    assert_eq!(response.status, StatusCode::NoContent);
    assert!(response.body.is_empty());
    assert!(response.header("Content-Length").is_none());
    assert_eq!(response.header("Access-Control-Allow-Methods"), Some("GET, OPTIONS"));
}

#[test]
fn test_serialize_response_wire_format() {
    let response = ResponseBuilder::new(StatusCode::BadGateway)
        .header("Content-Type", "application/json")
        .body(b"{}".to_vec())
        .build();

    let wire = String::from_utf8(serialize_response(&response)).unwrap();

    assert!(wire.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
    assert!(wire.contains("Content-Type: application/json\r\n"));
    assert!(wire.contains("Content-Length: 2\r\n"));
    assert!(wire.ends_with("\r\n\r\n{}"));
}
