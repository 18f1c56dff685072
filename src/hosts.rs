//! Candidate hosts and the active-host cursor.
//!
//! The registry is an owned, non-empty list of [`HostDescriptor`]s in configuration order plus
//! an atomic index naming the active one. The first entry is the preferred host, later entries
//! are fallbacks; there is no load balancing beyond that order.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

/// Endpoint used when no URL is configured.
pub const DEFAULT_URL: &str = "http://localhost:8529";

/// Transport scheme of a host. Agents are pooled per scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// The URL scheme name.
    ///
    /// ```
    /// use c8_client::HostDescriptor;
    ///
    /// let host = HostDescriptor::parse("https://eu-1.example.io").unwrap();
    /// assert_eq!(host.scheme().as_str(), "https");
    /// assert_eq!(host.port(), 443);
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One network-reachable instance of the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDescriptor {
    scheme: Scheme,
    host: String,
    port: u16,
    base_url: Url,
}

impl HostDescriptor {
    /// Parses an `http://` or `https://` URL into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns an error for unparseable URLs, other schemes, or URLs without a host.
    pub fn parse(url: &str) -> Result<Self> {
        let base_url = Url::parse(url)?;
        let scheme = match base_url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            other => {
                return Err(Error::ConfigurationError(format!(
                    "Unsupported scheme '{}' in {}",
                    other, url
                )))
            }
        };
        let host = base_url
            .host_str()
            .ok_or_else(|| Error::ConfigurationError(format!("URL has no host: {}", url)))?
            .to_string();
        let port = base_url
            .port_or_known_default()
            .ok_or_else(|| Error::ConfigurationError(format!("URL has no port: {}", url)))?;
        Ok(Self {
            scheme,
            host,
            port,
            base_url,
        })
    }

    /// Scheme of the host; selects the pooled agent.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host name or address, without scheme or port.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, or the scheme's default.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The URL the descriptor was parsed from; request paths are appended to its path.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl fmt::Display for HostDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// A data center as reported by `/_api/datacenter/all`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataCenter {
    /// Data center name, e.g. `dev-ap-southeast-1`.
    pub name: String,
    /// Internal address of the cluster.
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    /// `true` for the data center that answered the query.
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub tags: DataCenterTags,
}

/// Location and addressing tags of a [`DataCenter`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DataCenterTags {
    /// Public hostname of the regional REST endpoint.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub countrycode: Option<String>,
    #[serde(default)]
    pub countryname: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl DataCenter {
    /// The REST endpoint of this data center, `https://{tags.url}`.
    pub fn endpoint(&self) -> Option<String> {
        self.tags.url.as_ref().map(|url| format!("https://{}", url))
    }
}

/// Where the candidate hosts come from.
#[derive(Debug, Clone, Default)]
pub enum HostSource {
    /// The loopback endpoint [`DEFAULT_URL`].
    #[default]
    Default,
    /// A single URL.
    Url(String),
    /// An explicit list of URLs, in preference order.
    Urls(Vec<String>),
    /// A discovered data-center list; data centers without a public URL are skipped.
    DataCenters(Vec<DataCenter>),
}

/// The ordered candidate hosts and the active-host cursor.
///
/// The active index is shared by every clone of a client. Concurrent requests may move it;
/// that only changes which valid host the next call starts with.
#[derive(Debug)]
pub struct HostRegistry {
    hosts: Vec<HostDescriptor>,
    active: AtomicUsize,
}

impl HostRegistry {
    /// Creates a registry over `hosts`, with the first entry active.
    ///
    /// # Errors
    ///
    /// Returns an error if `hosts` is empty.
    pub fn new(hosts: Vec<HostDescriptor>) -> Result<Self> {
        if hosts.is_empty() {
            return Err(Error::ConfigurationError(
                "At least one host is required".to_string(),
            ));
        }
        Ok(Self {
            hosts,
            active: AtomicUsize::new(0),
        })
    }

    /// Resolves a [`HostSource`] into a registry.
    ///
    /// ```
    /// use c8_client::hosts::{HostRegistry, HostSource};
    ///
    /// let registry = HostRegistry::resolve(HostSource::Urls(vec![
    ///     "https://eu.example.com".to_string(),
    ///     "https://us.example.com:8443".to_string(),
    /// ]))
    /// .unwrap();
    /// assert_eq!(registry.active().host(), "eu.example.com");
    /// assert!(registry.advance());
    /// assert_eq!(registry.active().port(), 8443);
    /// assert!(!registry.advance());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid or the source yields no host.
    pub fn resolve(source: HostSource) -> Result<Self> {
        let hosts = match source {
            HostSource::Default => vec![HostDescriptor::parse(DEFAULT_URL)?],
            HostSource::Url(url) => vec![HostDescriptor::parse(&url)?],
            HostSource::Urls(urls) => urls
                .iter()
                .map(|url| HostDescriptor::parse(url))
                .collect::<Result<Vec<_>>>()?,
            HostSource::DataCenters(data_centers) => data_centers
                .iter()
                .filter_map(DataCenter::endpoint)
                .map(|url| HostDescriptor::parse(&url))
                .collect::<Result<Vec<_>>>()?,
        };
        Self::new(hosts)
    }

    /// Number of hosts. Never zero.
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Always `false`: a registry holds at least one host.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// All hosts, in preference order.
    pub fn hosts(&self) -> &[HostDescriptor] {
        &self.hosts
    }

    /// Position of the active host. Requests start their walk here.
    pub fn active_index(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// The active host.
    pub fn active(&self) -> &HostDescriptor {
        &self.hosts[self.active_index()]
    }

    /// Returns the host at `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<&HostDescriptor> {
        self.hosts.get(index)
    }

    /// Moves the active host to the next entry.
    ///
    /// Returns `false`, leaving the active host unchanged, once the end of the list is reached.
    pub fn advance(&self) -> bool {
        self.active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |index| {
                (index + 1 < self.hosts.len()).then_some(index + 1)
            })
            .is_ok()
    }

    /// Returns the entry after `index` and makes it active, unless another call already moved
    /// the cursor away from `index`.
    pub(crate) fn advance_from(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        if next >= self.hosts.len() {
            return None;
        }
        let _ = self
            .active
            .compare_exchange(index, next, Ordering::AcqRel, Ordering::Acquire);
        Some(next)
    }

    /// Marks `index` as the host that answered last.
    pub(crate) fn settle(&self, index: usize) {
        if index < self.hosts.len() {
            self.active.store(index, Ordering::Release);
        }
    }

    /// Makes the preferred (first) host active again.
    pub fn reset(&self) {
        self.active.store(0, Ordering::Release);
    }
}
