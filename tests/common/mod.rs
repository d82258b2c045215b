#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use mirror_relay::relay::{MirrorList, UpstreamClient, UpstreamResult};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

/// Upstream fake answering per mirror host and recording every URL it is asked for.
#[derive(Clone, Default)]
pub struct ScriptedUpstream {
    responses: HashMap<String, UpstreamResult>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, host: &str, status: u16, body: &str) -> Self {
        self.responses
            .insert(host.to_string(), UpstreamResult::new(status, body));
        self
    }

    /// URLs requested so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }
}

impl UpstreamClient for ScriptedUpstream {
    fn fetch(&self, url: &Url) -> impl Future<Output = UpstreamResult> + Send {
        self.calls.lock().unwrap().push(url.to_string());
        let result = url
            .host_str()
            .and_then(|host| self.responses.get(host).cloned())
            .unwrap_or_else(UpstreamResult::transport_failure);
        async move { result }
    }
}

/// `https://a.test`, `https://b.test`, ...
pub fn mirrors(hosts: &[&str]) -> MirrorList {
    MirrorList::parse(hosts.iter().map(|h| format!("https://{}", h))).unwrap()
}

/// A plain TCP server answering every request with one canned HTTP response.
pub struct FakeMirror {
    pub addr: SocketAddr,
    /// Raw requests received (head and body), in order
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeMirror {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub async fn start_mirror(status: u16, reason: &str, headers: &[(&str, &str)], body: &str) -> FakeMirror {
    let mut response = format!("HTTP/1.1 {} {}\r\n", status, reason);
    for (k, v) in headers {
        response.push_str(&format!("{}: {}\r\n", k, v));
    }
    response.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n{}", body.len(), body));

    start_raw(Some(response)).await
}

/// Accepts connections and reads requests but never answers.
pub async fn start_silent_mirror() -> FakeMirror {
    start_raw(None).await
}

async fn start_raw(response: Option<String>) -> FakeMirror {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let log = Arc::clone(&log);
            let response = response.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                let head_end = buf.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
                let wanted = head_end + content_length(&buf[..head_end]);
                while buf.len() < wanted {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }
                log.lock().unwrap().push(String::from_utf8_lossy(&buf).into_owned());

                match response {
                    Some(response) => {
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    }
                    None => {
                        // Hold the connection open without answering
                        let _ = socket.read(&mut chunk).await;
                    }
                }
            });
        }
    });

    FakeMirror { addr, requests }
}

fn content_length(head: &[u8]) -> usize {
    String::from_utf8_lossy(head)
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// An address nothing is listening on.
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
