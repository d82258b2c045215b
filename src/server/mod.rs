//! TCP front door for the relay.

pub mod listener;

pub use listener::{run, serve};
