//! HTTP protocol implementation.
//!
//! A small HTTP/1.1 server with keep-alive support, just enough to carry
//! the relay's JSON surface.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection request-response state machine
//! - **`parser`**: Parses incoming HTTP requests from byte buffers
//! - **`request`**: HTTP request representation
//! - **`response`**: HTTP response representation with builder pattern and CORS helpers
//! - **`writer`**: Serializes and writes HTTP responses to the client
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for incoming request data
//!        └──────┬──────┘
//!               │ Request received (malformed → 500, then Closed)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Relay produces the response
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Close → Closed
//! ```

pub mod request;
pub mod response;
pub mod parser;
pub mod connection;
pub mod writer;
