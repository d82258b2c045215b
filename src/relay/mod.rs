//! Upstream failover relay
//!
//! Forwards `/api/versions/{current,future,past}` to an ordered list of
//! mirrors, skipping rate-limited or failing ones, and returns the first
//! 2xx payload.

pub mod endpoint;
pub mod error;
pub mod handler;
pub mod mirror;
pub mod upstream;

pub use endpoint::VersionEndpoint;
pub use error::RelayError;
pub use handler::Relay;
pub use mirror::{Mirror, MirrorList};
pub use upstream::{HttpUpstream, UpstreamClient, UpstreamResult};
