use std::collections::HashMap;

/// HTTP request methods.
///
/// The relay only serves GET and OPTIONS. Other methods are parsed so they
/// can be answered with 405 Method Not Allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - CORS preflight
    OPTIONS,
    /// PATCH - Partial modification of a resource
    PATCH
}

/// Represents a parsed HTTP request from a client.
///
/// `path` is the raw request target as it appeared on the request line,
/// query string included.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, OPTIONS, etc.)
    pub method: Method,
    /// The request target (e.g., "/api/versions/current?x=1")
    pub path: String,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Request headers as key-value pairs, names as sent by the client
    pub headers: HashMap<String, String>,
    /// Request body
    pub body: Vec<u8>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Method {
    /// Parses an HTTP method from a string.
    ///
    /// Method names are case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use mirror_relay::http::request::Method;
    /// assert_eq!(Method::from_str("OPTIONS"), Some(Method::OPTIONS));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            path: None,
            version: None,
            headers: HashMap::new(),
            body: Vec::new()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: self.path.ok_or("path missing")?,
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring ASCII case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// HTTP/1.1 defaults to keep-alive, HTTP/1.0 to close. An explicit
    /// Connection header wins in both cases.
    pub fn keep_alive(&self) -> bool {
        match self.header("Connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version != "HTTP/1.0",
        }
    }
}
