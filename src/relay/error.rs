//! Relay error taxonomy.
//!
//! Only aggregate outcomes live here. A rate-limited or failing mirror is
//! absorbed by the fan-out loop and never becomes a `RelayError`.

use thiserror::Error;

use crate::http::response::{Response, StatusCode};

#[derive(Debug, Error)]
pub enum RelayError {
    /// Path is not one of the recognized endpoints.
    #[error("no such endpoint")]
    NotFound,

    /// Method other than GET or OPTIONS.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// Every mirror was tried and none returned 2xx.
    #[error("all mirrors exhausted")]
    UpstreamUnavailable,

    /// Anything unexpected while handling the request. The cause is logged,
    /// never sent to the client.
    #[error("internal relay error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::NotFound => StatusCode::NotFound,
            RelayError::MethodNotAllowed => StatusCode::MethodNotAllowed,
            RelayError::UpstreamUnavailable => StatusCode::BadGateway,
            RelayError::Internal(_) => StatusCode::InternalServerError,
        }
    }

    /// Value of the `error` field in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::NotFound => "not_found",
            RelayError::MethodNotAllowed => "method_not_allowed",
            RelayError::UpstreamUnavailable => "upstream_unavailable",
            RelayError::Internal(_) => "proxy_error",
        }
    }

    pub fn into_response(self) -> Response {
        Response::json_error(self.status(), self.code())
    }
}
