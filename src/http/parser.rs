use crate::http::request::{Method, Request};
use std::collections::HashMap;

#[derive(Debug)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidHeader,
    InvalidContentLength,
    Incomplete,
}

/// Parses one request from the front of `buf`.
///
/// Returns the request and the number of bytes it occupied, or
/// `ParseError::Incomplete` when more data is needed.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];
    let body_bytes = &buf[headers_end + 4..];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;

    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        headers.insert(
           key.trim().to_string(),
           value.trim().to_string(),
        );
    }

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
        .map(|(_, v)| v.parse::<usize>().map_err(|_| ParseError::InvalidContentLength))
        .transpose()?
        .unwrap_or(0);

    if body_bytes.len() < content_length {
        return Err(ParseError::Incomplete);
    }

    let body = body_bytes[..content_length].to_vec();

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body,
    };

    let total_consumed = headers_end + 4 + content_length;
    Ok((request, total_consumed))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
