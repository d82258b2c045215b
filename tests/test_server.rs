//! End-to-end tests over a real socket

mod common;

use std::net::SocketAddr;
use std::sync::Arc;

use common::{mirrors, ScriptedUpstream};
use mirror_relay::relay::Relay;
use mirror_relay::server;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn start_relay(upstream: ScriptedUpstream, hosts: &[&str]) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = Arc::new(Relay::new(mirrors(hosts), upstream));
    tokio::spawn(server::serve(listener, relay));
    addr
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

async fn raw_exchange(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_get_version_through_socket() {
    let upstream = ScriptedUpstream::new()
        .respond("a.test", 429, "")
        .respond("b.test", 200, r#"{"version":"1"}"#);
    let addr = start_relay(upstream, &["a.test", "b.test"]).await;

    let res = client()
        .get(format!("http://{}/api/versions/current", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"version": "1"}));
}

#[tokio::test]
async fn test_preflight_through_socket() {
    let upstream = ScriptedUpstream::new();
    let addr = start_relay(upstream.clone(), &["a.test"]).await;

    let res = client()
        .request(reqwest::Method::OPTIONS, format!("http://{}/anything", addr))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 204);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["access-control-allow-methods"], "GET, OPTIONS");
    assert_eq!(res.headers()["access-control-allow-headers"], "Content-Type");
    assert!(res.bytes().await.unwrap().is_empty());
    assert!(upstream.calls().is_empty());
}

#[tokio::test]
async fn test_not_found_and_unavailable_through_socket() {
    let upstream = ScriptedUpstream::new().respond("a.test", 500, "");
    let addr = start_relay(upstream, &["a.test"]).await;
    let client = client();

    let res = client
        .get(format!("http://{}/api/versions/bogus", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"error": "not_found"}));

    let res = client
        .get(format!("http://{}/api/versions/past", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 502);
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"error": "upstream_unavailable"}));
}

#[tokio::test]
async fn test_keep_alive_serves_pipelined_requests() {
    let upstream = ScriptedUpstream::new().respond("a.test", 200, "ok");
    let addr = start_relay(upstream, &["a.test"]).await;

    let out = raw_exchange(
        addr,
        b"OPTIONS / HTTP/1.1\r\n\r\nGET /api/versions/future HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(out.contains("HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with("\r\n\r\n\"ok\""));
}

#[tokio::test]
async fn test_malformed_request_gets_proxy_error() {
    let addr = start_relay(ScriptedUpstream::new(), &["a.test"]).await;

    let out = raw_exchange(addr, b"BREW /pot HTTP/1.1\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
    assert!(out.ends_with(r#"{"error":"proxy_error"}"#));
}

#[tokio::test]
async fn test_head_response_carries_no_body() {
    let upstream = ScriptedUpstream::new().respond("a.test", 200, r#"{"v":1}"#);
    let addr = start_relay(upstream, &["a.test"]).await;

    let out = raw_exchange(
        addr,
        b"HEAD /api/versions/current HTTP/1.1\r\n\r\nGET /api/versions/current HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    // The second status line follows the first head directly
    assert!(out.contains("\r\n\r\nHTTP/1.1 200 OK\r\n"));
    assert!(!out.contains("method_not_allowed"));
    assert!(out.ends_with(r#"{"v":1}"#));
}
