//! Mirror Relay - upstream failover relay
//!
//! Core library for the HTTP surface, mirror fan-out and the obfuscation
//! API client.

pub mod config;
pub mod http;
pub mod obfuscation;
pub mod relay;
pub mod server;
