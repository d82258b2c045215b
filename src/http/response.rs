use serde_json::Value;
use std::collections::HashMap;

/// CORS headers attached to every relay response.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

/// HTTP status codes the relay can answer with.
///
/// - `Ok` (200): Proxied upstream payload
/// - `NoContent` (204): CORS preflight
/// - `NotFound` (404): Unknown endpoint
/// - `MethodNotAllowed` (405): Method other than GET or OPTIONS
/// - `InternalServerError` (500): Catch-all relay failure
/// - `BadGateway` (502): Every mirror exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 204 No Content
    NoContent,
    /// 404 Not Found
    NotFound,
    /// 405 Method Not Allowed
    MethodNotAllowed,
    /// 500 Internal Server Error
    InternalServerError,
    /// 502 Bad Gateway
    BadGateway,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use mirror_relay::http::response::StatusCode;
    /// assert_eq!(StatusCode::NoContent.as_u16(), 204);
    /// assert_eq!(StatusCode::BadGateway.as_u16(), 502);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NoContent => 204,
            StatusCode::NotFound => 404,
            StatusCode::MethodNotAllowed => 405,
            StatusCode::InternalServerError => 500,
            StatusCode::BadGateway => 502,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::NoContent => "No Content",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::BadGateway => "Bad Gateway",
        }
    }
}

/// Represents a complete HTTP response ready to be sent to a client.
#[derive(Debug)]
pub struct Response {
    /// The HTTP status code
    pub status: StatusCode,
    /// HTTP headers as key-value pairs
    pub headers: HashMap<String, String>,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .cors()
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Adds the CORS headers.
    pub fn cors(mut self) -> Self {
        for (key, value) in CORS_HEADERS {
            self.headers.insert(key.to_string(), value.to_string());
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Adds a Content-Length header from the body size unless one is
    /// already set. 204 responses never carry one.
    pub fn build(mut self) -> Response {
        if self.status != StatusCode::NoContent {
            self.headers
                .entry("Content-Length".to_string())
                .or_insert_with(|| self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a JSON response with CORS headers.
    pub fn json(status: StatusCode, payload: &Value) -> Self {
        ResponseBuilder::new(status)
            .cors()
            .header("Content-Type", "application/json")
            .body(payload.to_string().into_bytes())
            .build()
    }

    /// Creates the `{"error": code}` body used for every relay failure.
    pub fn json_error(status: StatusCode, code: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": code }))
    }

    /// Creates the 204 answer to a CORS preflight.
    pub fn preflight() -> Self {
        ResponseBuilder::new(StatusCode::NoContent)
            .cors()
            .build()
    }

    /// Returns a header value, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
