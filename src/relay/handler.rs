//! Request handling and mirror fan-out
//!
//! Mirrors are tried one at a time, strictly in list order. The first 2xx
//! answer wins and later mirrors are never contacted.

use crate::http::request::{Method, Request};
use crate::http::response::{Response, StatusCode};
use crate::relay::endpoint::VersionEndpoint;
use crate::relay::error::RelayError;
use crate::relay::mirror::MirrorList;
use crate::relay::upstream::{UpstreamClient, UpstreamResult};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Base used to resolve origin-form request targets into a pathname.
const REQUEST_BASE: &str = "http://relay.invalid/";

/// What a single mirror attempt means for the fan-out loop
enum Attempt {
    /// 2xx body, stop here
    Chosen(String),
    /// 429, move on
    RateLimited,
    /// Any other status, transport failures included, move on
    Skipped(u16),
}

impl From<UpstreamResult> for Attempt {
    fn from(result: UpstreamResult) -> Self {
        if result.is_rate_limited() {
            Attempt::RateLimited
        } else if result.is_success() {
            Attempt::Chosen(result.body)
        } else {
            Attempt::Skipped(result.status)
        }
    }
}

/// The relay: a read-only mirror list plus the client used to reach it.
///
/// Holds no per-request state, so one instance is shared by every
/// connection.
pub struct Relay<C> {
    mirrors: MirrorList,
    upstream: C,
}

impl<C: UpstreamClient> Relay<C> {
    pub fn new(mirrors: MirrorList, upstream: C) -> Self {
        Self { mirrors, upstream }
    }

    pub fn mirrors(&self) -> &MirrorList {
        &self.mirrors
    }

    /// Produce the response for one inbound request.
    ///
    /// Never fails: every error is turned into its JSON error response.
    pub async fn handle(&self, request: &Request) -> Response {
        match self.route(request).await {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    RelayError::Internal(cause) => tracing::error!(
                        method = ?request.method,
                        path = %request.path,
                        cause = %cause,
                        "Relay failed to handle request"
                    ),
                    other => tracing::debug!(
                        method = ?request.method,
                        path = %request.path,
                        status = other.status().as_u16(),
                        "Request rejected"
                    ),
                }
                err.into_response()
            }
        }
    }

    async fn route(&self, request: &Request) -> Result<Response, RelayError> {
        if request.method == Method::OPTIONS {
            return Ok(Response::preflight());
        }

        let path = request_pathname(&request.path)?;

        if request.method != Method::GET {
            return Err(RelayError::MethodNotAllowed);
        }

        let endpoint = VersionEndpoint::from_path(&path).ok_or(RelayError::NotFound)?;
        let payload = self.fan_out(endpoint).await?;

        Ok(Response::json(StatusCode::Ok, &payload))
    }

    /// Try each mirror in order until one answers 2xx.
    ///
    /// Returns the decoded payload of the chosen mirror, or
    /// `UpstreamUnavailable` once the list is exhausted.
    pub async fn fan_out(&self, endpoint: VersionEndpoint) -> Result<Value, RelayError> {
        for (index, mirror) in self.mirrors.iter().enumerate() {
            let url = mirror
                .endpoint_url(endpoint)
                .map_err(|e| RelayError::Internal(format!("bad upstream URL for {}: {}", mirror, e)))?;

            match Attempt::from(self.upstream.fetch(&url).await) {
                Attempt::Chosen(body) => {
                    tracing::info!(
                        mirror = %mirror,
                        endpoint = endpoint.name(),
                        attempt = index + 1,
                        "Upstream answered"
                    );
                    return Ok(decode_payload(body));
                }
                Attempt::RateLimited => {
                    tracing::debug!(mirror = %mirror, endpoint = endpoint.name(), "Mirror rate limited, trying next");
                }
                Attempt::Skipped(status) => {
                    tracing::debug!(mirror = %mirror, endpoint = endpoint.name(), status, "Mirror failed, trying next");
                }
            }
        }

        tracing::warn!(
            endpoint = endpoint.name(),
            mirrors = self.mirrors.len(),
            "All mirrors exhausted"
        );
        Err(RelayError::UpstreamUnavailable)
    }
}

/// Parse a body as JSON, falling back to the raw text as a JSON string.
///
/// Any syntactically valid document is kept as JSON: nesting depth is
/// unbounded and key order is preserved. Numbers too large for an f64 become
/// `null`.
pub fn decode_payload(body: String) -> Value {
    match parse_json(&body) {
        Ok(mut value) => {
            null_non_finite_numbers(&mut value);
            value
        }
        Err(_) => Value::String(body),
    }
}

fn parse_json(text: &str) -> serde_json::Result<Value> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn null_non_finite_numbers(value: &mut Value) {
    let mut pending = vec![value];
    while let Some(v) = pending.pop() {
        let non_finite = matches!(&*v, Value::Number(n) if !n.as_f64().is_some_and(f64::is_finite));
        if non_finite {
            *v = Value::Null;
            continue;
        }
        match v {
            Value::Array(items) => pending.extend(items.iter_mut()),
            Value::Object(map) => pending.extend(map.values_mut()),
            _ => {}
        }
    }
}

/// Pathname of a request target, with query and fragment removed and dot
/// segments resolved.
pub fn request_pathname(target: &str) -> Result<String, RelayError> {
    Url::parse(REQUEST_BASE)
        .and_then(|base| base.join(target))
        .map(|url| url.path().to_string())
        .map_err(|e| RelayError::Internal(format!("unparsable request target {:?}: {}", target, e)))
}
