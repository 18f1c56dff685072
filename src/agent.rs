//! Transport agents and the per-scheme agent pool.
//!
//! An [`Agent`] is a reusable transport resource (connection pool, keep-alive sockets) able to
//! execute requests against any host of one scheme. The [`AgentPool`] creates at most one agent
//! per scheme through its [`Connector`], hands the same agent to every request of that scheme,
//! and destroys each agent exactly once when the client is closed.
//!
//! A caller-supplied agent replaces the pool for every scheme. The pool never creates or
//! destroys such an agent; its owner does.

use crate::hosts::Scheme;
use crate::{Error, Result};
use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// A fully composed request, ready for the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    /// Per-request timeout; `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

/// The raw outcome of a request that reached a host.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// A transport backend capable of executing requests.
///
/// Implementations report failures that happened before a response was read as
/// [`Error::Network`], [`Error::Connection`] or [`Error::Timeout`]; the dispatcher fails over
/// on those.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Executes one request.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;

    /// Releases the agent's sockets. Called at most once, by the pool that created the agent.
    fn destroy(&self);
}

/// Creates agents for the pool.
pub trait Connector: Send + Sync {
    /// Builds a new agent for `scheme`.
    fn connect(&self, scheme: Scheme, options: &AgentOptions) -> Result<Arc<dyn Agent>>;
}

/// Options used when the pool builds an agent.
///
/// All fields are optional; unset fields keep the backend defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AgentOptions {
    /// Maximum idle keep-alive connections kept per host.
    pub max_idle_per_host: Option<usize>,
    /// How long an idle connection is kept, in milliseconds.
    pub idle_timeout_ms: Option<u64>,
    /// Connection establishment timeout, in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// TCP keep-alive interval, in milliseconds.
    pub tcp_keepalive_ms: Option<u64>,
}

/// The default backend: one `reqwest` client per scheme.
pub struct ReqwestAgent {
    scheme: Scheme,
    client: RwLock<Option<reqwest::Client>>,
}

impl ReqwestAgent {
    /// Builds an agent for `scheme` with the given options.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(scheme: Scheme, options: &AgentOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder().https_only(scheme == Scheme::Https);
        if let Some(max_idle) = options.max_idle_per_host {
            builder = builder.pool_max_idle_per_host(max_idle);
        }
        if let Some(ms) = options.idle_timeout_ms {
            builder = builder.pool_idle_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = options.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = options.tcp_keepalive_ms {
            builder = builder.tcp_keepalive(Duration::from_millis(ms));
        }
        let client = builder.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            scheme,
            client: RwLock::new(Some(client)),
        })
    }

    fn client(&self) -> Option<reqwest::Client> {
        self.client
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn transport_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}

#[async_trait]
impl Agent for ReqwestAgent {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let client = self.client().ok_or(Error::Closed)?;

        let mut builder = client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    fn destroy(&self) {
        let client = self
            .client
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if client.is_some() {
            tracing::debug!(scheme = %self.scheme, "Destroyed HTTP agent");
        }
    }
}

/// Builds [`ReqwestAgent`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestConnector;

impl Connector for ReqwestConnector {
    fn connect(&self, scheme: Scheme, options: &AgentOptions) -> Result<Arc<dyn Agent>> {
        Ok(Arc::new(ReqwestAgent::new(scheme, options)?))
    }
}

struct PoolState {
    agents: Vec<(Scheme, Arc<dyn Agent>)>,
    closed: bool,
}

/// Owns the client's agents.
pub struct AgentPool {
    connector: Arc<dyn Connector>,
    options: AgentOptions,
    explicit: Option<Arc<dyn Agent>>,
    state: Mutex<PoolState>,
}

impl AgentPool {
    /// Creates an empty pool. Agents are built on first use.
    pub fn new(
        connector: Arc<dyn Connector>,
        options: AgentOptions,
        explicit: Option<Arc<dyn Agent>>,
    ) -> Self {
        Self {
            connector,
            options,
            explicit,
            state: Mutex::new(PoolState {
                agents: Vec::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the agent for `scheme`, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Closed`] after [`close_all`](Self::close_all), or the connector's error.
    pub fn get(&self, scheme: Scheme) -> Result<Arc<dyn Agent>> {
        let mut state = self.lock();
        if state.closed {
            return Err(Error::Closed);
        }
        if let Some(agent) = &self.explicit {
            return Ok(Arc::clone(agent));
        }
        if let Some((_, agent)) = state.agents.iter().find(|(owned, _)| *owned == scheme) {
            return Ok(Arc::clone(agent));
        }

        let agent = self.connector.connect(scheme, &self.options)?;
        tracing::debug!(scheme = %scheme, "Created HTTP agent");
        state.agents.push((scheme, Arc::clone(&agent)));
        Ok(agent)
    }

    /// Destroys every pool-owned agent. Returns how many were destroyed; `0` on repeated calls.
    pub fn close_all(&self) -> usize {
        let agents = {
            let mut state = self.lock();
            if state.closed {
                return 0;
            }
            state.closed = true;
            std::mem::take(&mut state.agents)
        };
        for (_, agent) in &agents {
            agent.destroy();
        }
        agents.len()
    }

    /// Whether [`close_all`](Self::close_all) has run. Once set, the pool hands out no agents.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of agents the pool created and still owns.
    pub fn owned(&self) -> usize {
        self.lock().agents.len()
    }
}

impl Drop for AgentPool {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingAgent {
        destroyed: AtomicUsize,
    }

    #[async_trait]
    impl Agent for CountingAgent {
        async fn execute(&self, _request: TransportRequest) -> Result<TransportResponse> {
            Err(Error::Connection("unused".to_string()))
        }

        fn destroy(&self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingConnector {
        created: Mutex<Vec<Arc<CountingAgent>>>,
    }

    impl Connector for CountingConnector {
        fn connect(&self, _scheme: Scheme, _options: &AgentOptions) -> Result<Arc<dyn Agent>> {
            let agent = Arc::new(CountingAgent::default());
            self.created.lock().unwrap().push(Arc::clone(&agent));
            Ok(agent)
        }
    }

    #[test]
    fn test_agents_are_memoized_per_scheme() {
        let connector = Arc::new(CountingConnector::default());
        let pool = AgentPool::new(connector.clone(), AgentOptions::default(), None);

        let first = pool.get(Scheme::Http).unwrap();
        let second = pool.get(Scheme::Http).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        pool.get(Scheme::Https).unwrap();

        assert_eq!(connector.created.lock().unwrap().len(), 2);
        assert_eq!(pool.owned(), 2);
    }

    #[test]
    fn test_close_destroys_each_agent_once() {
        let connector = Arc::new(CountingConnector::default());
        let pool = AgentPool::new(connector.clone(), AgentOptions::default(), None);
        pool.get(Scheme::Http).unwrap();
        pool.get(Scheme::Https).unwrap();

        assert_eq!(pool.close_all(), 2);
        assert_eq!(pool.close_all(), 0);
        drop(pool);

        for agent in connector.created.lock().unwrap().iter() {
            assert_eq!(agent.destroyed.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_get_after_close_fails_fast() {
        let pool = AgentPool::new(
            Arc::new(CountingConnector::default()),
            AgentOptions::default(),
            None,
        );
        pool.close_all();
        assert!(matches!(pool.get(Scheme::Http), Err(Error::Closed)));
    }

    #[test]
    fn test_explicit_agent_is_never_created_or_destroyed() {
        let connector = Arc::new(CountingConnector::default());
        let explicit = Arc::new(CountingAgent::default());
        let pool = AgentPool::new(
            connector.clone(),
            AgentOptions::default(),
            Some(explicit.clone() as Arc<dyn Agent>),
        );

        let http = pool.get(Scheme::Http).unwrap();
        let https = pool.get(Scheme::Https).unwrap();
        assert!(Arc::ptr_eq(&http, &https));
        assert_eq!(pool.close_all(), 0);
        drop(pool);

        assert!(connector.created.lock().unwrap().is_empty());
        assert_eq!(explicit.destroyed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrent_first_use_creates_one_agent() {
        let connector = Arc::new(CountingConnector::default());
        let pool = Arc::new(AgentPool::new(
            connector.clone(),
            AgentOptions::default(),
            None,
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || pool.get(Scheme::Https).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(connector.created.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_destroyed_reqwest_agent_refuses_requests() {
        let agent = ReqwestAgent::new(Scheme::Http, &AgentOptions::default()).unwrap();
        agent.destroy();

        let result = agent
            .execute(TransportRequest {
                method: Method::GET,
                url: Url::parse("http://127.0.0.1:1/").unwrap(),
                headers: HeaderMap::new(),
                body: None,
                timeout: None,
            })
            .await;
        assert!(matches!(result, Err(Error::Closed)));
    }
}
