//! Mirror list management
//!
//! A mirror is a base URL believed to serve the same data as its siblings.
//! The list is fixed at startup and shared read-only by every request; its
//! order is the order mirrors are tried in.

use crate::relay::endpoint::VersionEndpoint;
use anyhow::{Context, Result};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A single upstream mirror
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror {
    /// Base URL without trailing slash (e.g., "https://weao.xyz")
    base: String,
}

impl Mirror {
    /// Parse and validate a mirror base URL.
    ///
    /// Only absolute `http`/`https` URLs with a host are accepted. A trailing
    /// slash is dropped so endpoint paths join cleanly.
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw.trim())
            .with_context(|| format!("Invalid mirror URL: {}", raw))?;

        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("Mirror URL must be http or https: {}", raw);
        }
        if url.host_str().is_none() {
            anyhow::bail!("Mirror URL missing host: {}", raw);
        }
        if url.query().is_some() || url.fragment().is_some() {
            anyhow::bail!("Mirror URL must not carry a query or fragment: {}", raw);
        }

        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL as configured, minus trailing slash
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Full upstream URL for an endpoint: `{base}/api/versions/{name}`
    pub fn endpoint_url(&self, endpoint: VersionEndpoint) -> Result<Url, url::ParseError> {
        Url::parse(&format!("{}{}", self.base, endpoint.upstream_path()))
    }
}

impl fmt::Display for Mirror {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

/// Ordered, immutable list of mirrors
#[derive(Debug, Clone)]
pub struct MirrorList {
    mirrors: Arc<[Mirror]>,
}

impl MirrorList {
    pub fn new(mirrors: Vec<Mirror>) -> Self {
        Self {
            mirrors: mirrors.into(),
        }
    }

    /// Parse every entry, preserving order. Fails on the first invalid URL.
    pub fn parse<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mirrors = urls
            .into_iter()
            .map(|u| Mirror::parse(u.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(mirrors))
    }

    /// Mirrors in precedence order
    pub fn iter(&self) -> std::slice::Iter<'_, Mirror> {
        self.mirrors.iter()
    }

    pub fn len(&self) -> usize {
        self.mirrors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mirrors.is_empty()
    }
}

impl<'a> IntoIterator for &'a MirrorList {
    type Item = &'a Mirror;
    type IntoIter = std::slice::Iter<'a, Mirror>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
