use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::http::parser::{parse_http_request, ParseError};
use crate::http::request::{Method, Request};
use crate::http::writer::ResponseWriter;
use crate::relay::{Relay, RelayError, UpstreamClient};

/// Upper bound on buffered, not yet parsed request bytes.
const MAX_BUFFERED: usize = 64 * 1024;

pub struct Connection<C> {
    stream: TcpStream,
    buffer: BytesMut,
    state: ConnectionState,
    relay: Arc<Relay<C>>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

enum ReadOutcome {
    Request(Request),
    Malformed(ParseError),
    Eof,
}

impl<C: UpstreamClient> Connection<C> {
    pub fn new(stream: TcpStream, relay: Arc<Relay<C>>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            relay,
        }
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);

            self.state = match state {
                ConnectionState::Reading => match self.read_request().await? {
                    ReadOutcome::Request(req) => ConnectionState::Processing(req),
                    ReadOutcome::Malformed(e) => {
                        tracing::warn!(error = ?e, "Malformed request");
                        let response = RelayError::Internal(format!("{:?}", e)).into_response();
                        ConnectionState::Writing(ResponseWriter::new(&response), false)
                    }
                    ReadOutcome::Eof => ConnectionState::Closed,
                },

                ConnectionState::Processing(req) => {
                    let mut response = self.relay.handle(&req).await;
                    if req.method == Method::HEAD {
                        // Content-Length stays, the body never goes on the wire
                        response.body.clear();
                    }
                    let keep_alive = req.keep_alive();
                    ConnectionState::Writing(ResponseWriter::new(&response), keep_alive)
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        ConnectionState::Reading
                    } else {
                        ConnectionState::Closed
                    }
                }

                ConnectionState::Closed => break,
            };
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<ReadOutcome> {
        loop {
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(ReadOutcome::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    if self.buffer.len() > MAX_BUFFERED {
                        return Ok(ReadOutcome::Malformed(ParseError::InvalidRequest));
                    }
                }

                Err(e) => return Ok(ReadOutcome::Malformed(e)),
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Client closed connection
                return Ok(ReadOutcome::Eof);
            }
        }
    }
}
