//! Recognized relay endpoints.

/// Path prefix shared by the relay and every mirror.
pub const VERSIONS_PREFIX: &str = "/api/versions/";

/// One of the three version feeds a mirror serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionEndpoint {
    Current,
    Future,
    Past,
}

impl VersionEndpoint {
    pub const ALL: [VersionEndpoint; 3] = [
        VersionEndpoint::Current,
        VersionEndpoint::Future,
        VersionEndpoint::Past,
    ];

    /// Name as it appears in the URL.
    pub fn name(&self) -> &'static str {
        match self {
            VersionEndpoint::Current => "current",
            VersionEndpoint::Future => "future",
            VersionEndpoint::Past => "past",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.name() == name)
    }

    /// Matches a request pathname exactly against `/api/versions/{name}`.
    ///
    /// # Example
    ///
    /// ```
    /// # use mirror_relay::relay::VersionEndpoint;
    /// assert_eq!(VersionEndpoint::from_path("/api/versions/past"), Some(VersionEndpoint::Past));
    /// assert_eq!(VersionEndpoint::from_path("/api/versions/past/"), None);
    /// ```
    pub fn from_path(path: &str) -> Option<Self> {
        path.strip_prefix(VERSIONS_PREFIX).and_then(Self::from_name)
    }

    /// Path requested from a mirror, e.g. `/api/versions/current`.
    pub fn upstream_path(&self) -> String {
        format!("{}{}", VERSIONS_PREFIX, self.name())
    }
}
