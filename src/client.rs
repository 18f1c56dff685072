//! The client facade and request dispatcher.
//!
//! [`Client::send`] is the single path every call takes: compose headers, pick the active host,
//! borrow the agent for its scheme, execute, translate. Transport-class failures move the
//! request to the next host in configuration order, each host being tried at most once per
//! request. The walk starts at the active host and finishes with the hosts before it. Well-formed service responses end the request on the host that produced them,
//! which also becomes the host later calls start with.

use crate::{
    agent::{Agent, AgentOptions, AgentPool, Connector, ReqwestConnector, TransportRequest},
    failover::FailoverStrategy,
    headers::{Auth, HeaderComposer},
    hosts::{DataCenter, HostDescriptor, HostRegistry, HostSource},
    request::Request,
    translate::{translate, Decoded},
    Error, Response, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Fabric used when none is configured.
pub const DEFAULT_FABRIC: &str = "_system";

/// A client for a geo-distributed C8 deployment.
///
/// Cloning is cheap; clones share hosts, agents and configuration. [`Client::with_fabric`]
/// gives a clone that targets another fabric.
///
/// # Examples
///
/// ```no_run
/// use c8_client::{Client, Request};
///
/// # async fn example() -> Result<(), c8_client::Error> {
/// let client = Client::builder()
///     .urls(["https://eu.gdn.example.com", "https://us.gdn.example.com"])?
///     .api_key("demo.key")
///     .c8_version(30400)
///     .build()?;
///
/// let graph = client
///     .request(Request::get("/_api/graph/social"), |res| res.field::<serde_json::Value>("graph"))
///     .await?;
/// println!("Graph: {}", graph);
///
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
    fabric: Arc<str>,
}

struct ClientInner {
    hosts: HostRegistry,
    pool: AgentPool,
    headers: HeaderComposer,
    tenant: Option<String>,
    timeout: Option<Duration>,
    failover_strategy: FailoverStrategy,
    max_failovers: Option<usize>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Returns a client sharing this one's dispatcher but scoped to another fabric.
    pub fn with_fabric(&self, fabric: impl Into<String>) -> Client {
        Client {
            inner: Arc::clone(&self.inner),
            fabric: Arc::from(fabric.into()),
        }
    }

    /// The fabric fabric-scoped paths are resolved against.
    pub fn fabric(&self) -> &str {
        &self.fabric
    }

    /// The candidate hosts.
    pub fn hosts(&self) -> &HostRegistry {
        &self.inner.hosts
    }

    /// The headers sent with every request, before per-call overrides.
    pub fn default_headers(&self) -> &HeaderMap {
        self.inner.headers.defaults()
    }

    /// Destroys the agents this client created.
    ///
    /// Idempotent. Requests issued afterwards fail with [`Error::Closed`]; requests already
    /// holding an agent finish on their own. Caller-supplied agents are left untouched.
    pub fn close(&self) {
        let destroyed = self.inner.pool.close_all();
        tracing::debug!(agents = destroyed, "Client closed");
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.inner.pool.is_closed()
    }

    /// Dispatches a request and returns the decoded response.
    ///
    /// # Errors
    ///
    /// * [`Error::Service`] when a host answered with a service error.
    /// * [`Error::HostsExhausted`] when every candidate host failed at the transport level.
    /// * [`Error::Closed`] when the client was closed.
    pub async fn send(&self, request: Request) -> Result<Response<Value>> {
        if self.inner.pool.is_closed() {
            return Err(Error::Closed);
        }

        let start_time = Instant::now();
        let body = request.body.encode()?;
        let headers = self
            .inner
            .headers
            .compose(&request.headers, request.body.content_type());

        let hosts = &self.inner.hosts;
        let start = hosts.active_index();
        let mut index = start;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let host = hosts.get(index).ok_or_else(|| {
                Error::ConfigurationError(format!("Host index {} out of range", index))
            })?;
            let url = self.build_url(host, &request)?;

            let error = match self
                .execute_request(host, url, &request.method, &headers, body.clone(), attempt)
                .await
            {
                Ok(decoded) => {
                    hosts.settle(index);
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = decoded.raw.status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt,
                        host = %host,
                        "Received HTTP response"
                    );
                    return Ok(Response::new(
                        decoded.data,
                        decoded.raw.body,
                        decoded.raw.status,
                        decoded.raw.headers,
                        latency,
                        attempt,
                        host.to_string(),
                    ));
                }
                Err(e) if !e.is_retryable() => {
                    if matches!(e, Error::Service(_)) {
                        hosts.settle(index);
                    }
                    return Err(e);
                }
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                host = %host,
                method = %request.method,
                path = %request.path,
                "Request failed"
            );

            let within_budget = self
                .inner
                .max_failovers
                .map_or(true, |max| attempt <= max);

            // Hosts before the sticky start are visited last, so every host gets one try
            let next = match hosts.advance_from(index) {
                None if start > 0 => {
                    hosts.reset();
                    Some(0)
                }
                next => next,
            }
            .filter(|_| attempt < hosts.len());

            match next {
                Some(next) if within_budget => {
                    if let Some(delay) = self.inner.failover_strategy.delay_for_hop(attempt) {
                        tracing::info!(
                            delay_ms = delay.as_millis(),
                            attempt = attempt,
                            "Waiting before failover"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    tracing::info!(from = %host, to_index = next, "Failing over to next host");
                    index = next;
                }
                next => {
                    if next.is_none() {
                        hosts.reset();
                    }
                    return Err(Error::HostsExhausted {
                        attempts: attempt,
                        last_error: Box::new(error),
                    });
                }
            }
        }
    }

    /// Dispatches a request and hands the response to `shape`.
    ///
    /// `shape` runs once, on the successful response; its error is returned unchanged.
    pub async fn request<T, F>(&self, request: Request, shape: F) -> Result<T>
    where
        F: FnOnce(Response<Value>) -> Result<T>,
    {
        let response = self.send(request).await?;
        shape(response)
    }

    /// Dispatches a request and deserializes the whole body into `Res`.
    pub async fn call<Res>(&self, request: Request) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        let Response {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
            host,
        } = self.send(request).await?;

        match serde_json::from_value::<Res>(data) {
            Ok(data) => Ok(Response::new(
                data, raw_body, status, headers, latency, attempts, host,
            )),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    raw_response = %raw_body,
                    "Failed to deserialize response"
                );
                Err(Error::DeserializationFailed {
                    raw_response: raw_body,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// Makes a fabric-scoped GET request.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(Request::get(path)).await
    }

    /// Makes a fabric-scoped POST request with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(Request::post(path).with_json(body)?).await
    }

    /// Makes a fabric-scoped PUT request with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(Request::put(path).with_json(body)?).await
    }

    /// Makes a fabric-scoped PATCH request with a JSON body.
    pub async fn patch<Req, Res>(
        &self,
        path: impl Into<String>,
        body: &Req,
    ) -> Result<Response<Res>>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        self.call(Request::patch(path).with_json(body)?).await
    }

    /// Makes a fabric-scoped DELETE request.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned,
    {
        self.call(Request::delete(path)).await
    }

    /// Executes a single attempt against one host.
    async fn execute_request(
        &self,
        host: &HostDescriptor,
        url: Url,
        method: &Method,
        headers: &HeaderMap,
        body: Option<Vec<u8>>,
        attempt: usize,
    ) -> Result<Decoded> {
        let agent = self.inner.pool.get(host.scheme())?;

        tracing::debug!(
            method = %method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let raw = agent
            .execute(TransportRequest {
                method: method.clone(),
                url,
                headers: headers.clone(),
                body,
                timeout: self.inner.timeout,
            })
            .await?;

        translate(raw)
    }

    /// Joins the host's base URL, the tenant/fabric prefix and the request path.
    fn build_url(&self, host: &HostDescriptor, request: &Request) -> Result<Url> {
        let mut url = host.base_url().clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::ConfigurationError(format!("Host URL cannot carry a path: {}", host))
            })?;
            segments.pop_if_empty();
            if !request.absolute_path {
                if let Some(tenant) = &self.inner.tenant {
                    segments.extend(["_tenant", tenant.as_str()]);
                }
                segments.extend(["_fabric", &*self.fabric]);
            }
            segments.extend(request.path.split('/').filter(|segment| !segment.is_empty()));
        }

        if !request.query_params.is_empty() {
            url.query_pairs_mut().extend_pairs(
                request
                    .query_params
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            );
        }
        Ok(url)
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use c8_client::{ClientBuilder, FailoverStrategy};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), c8_client::Error> {
/// let client = ClientBuilder::new()
///     .urls(["https://eu.gdn.example.com", "https://us.gdn.example.com"])?
///     .bearer_token("eyJhbGciOi...")
///     .fabric("orders")
///     .timeout(Duration::from_secs(30))
///     .failover_strategy(FailoverStrategy::Linear {
///         delay: Duration::from_millis(250),
///     })
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    hosts: HostSource,
    default_headers: HeaderMap,
    auth: Auth,
    c8_version: Option<u32>,
    fabric: String,
    tenant: Option<String>,
    agent_options: AgentOptions,
    agent: Option<Arc<dyn Agent>>,
    connector: Option<Arc<dyn Connector>>,
    timeout: Option<Duration>,
    failover_strategy: FailoverStrategy,
    max_failovers: Option<usize>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            hosts: HostSource::Default,
            default_headers: HeaderMap::new(),
            auth: Auth::None,
            c8_version: None,
            fabric: DEFAULT_FABRIC.to_string(),
            tenant: None,
            agent_options: AgentOptions::default(),
            agent: None,
            connector: None,
            timeout: None,
            failover_strategy: FailoverStrategy::default(),
            max_failovers: None,
        }
    }

    /// Uses a single endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn url(mut self, url: impl AsRef<str>) -> Result<Self> {
        HostDescriptor::parse(url.as_ref())?;
        self.hosts = HostSource::Url(url.as_ref().to_string());
        Ok(self)
    }

    /// Uses an ordered list of endpoints; the first is preferred.
    ///
    /// # Errors
    ///
    /// Returns an error if any URL is invalid.
    pub fn urls<I, S>(mut self, urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = urls
            .into_iter()
            .map(|url| HostDescriptor::parse(url.as_ref()).map(|_| url.as_ref().to_string()))
            .collect::<Result<Vec<_>>>()?;
        self.hosts = HostSource::Urls(urls);
        Ok(self)
    }

    /// Uses the public endpoints of discovered data centers, in the given order.
    pub fn data_centers(mut self, data_centers: Vec<DataCenter>) -> Self {
        self.hosts = HostSource::DataCenters(data_centers);
        self
    }

    /// Authenticates with an API key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.auth = Auth::ApiKey(key.into());
        self
    }

    /// Authenticates with a bearer token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Bearer(token.into());
        self
    }

    /// Sends `x-c8-version` with every request.
    pub fn c8_version(mut self, version: u32) -> Self {
        self.c8_version = Some(version);
        self
    }

    /// Selects the fabric for fabric-scoped paths.
    pub fn fabric(mut self, fabric: impl Into<String>) -> Self {
        self.fabric = fabric.into();
        self
    }

    /// Prefixes fabric-scoped paths with `/_tenant/{tenant}`.
    pub fn tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the options the pool builds agents with.
    pub fn agent_options(mut self, options: AgentOptions) -> Self {
        self.agent_options = options;
        self
    }

    /// Uses `agent` for every request, whatever the scheme.
    ///
    /// The client never destroys an agent supplied this way.
    pub fn agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Replaces the backend the pool builds agents with.
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Sets the per-request timeout. A timed-out request fails over like any transport error.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the pacing between failover hops.
    pub fn failover_strategy(mut self, strategy: FailoverStrategy) -> Self {
        self.failover_strategy = strategy;
        self
    }

    /// Caps the number of failover hops per request. `0` disables failover.
    pub fn max_failovers(mut self, max: usize) -> Self {
        self.max_failovers = Some(max);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// Agents are created lazily, on the first request of each scheme.
    ///
    /// # Errors
    ///
    /// Returns an error if no usable host remains or the credentials are invalid.
    pub fn build(self) -> Result<Client> {
        let hosts = HostRegistry::resolve(self.hosts)?;
        let headers = HeaderComposer::new(&self.default_headers, &self.auth, self.c8_version)?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(ReqwestConnector));

        tracing::debug!(
            hosts = hosts.len(),
            fabric = %self.fabric,
            explicit_agent = self.agent.is_some(),
            "Built client"
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                hosts,
                pool: AgentPool::new(connector, self.agent_options, self.agent),
                headers,
                tenant: self.tenant,
                timeout: self.timeout,
                failover_strategy: self.failover_strategy,
                max_failovers: self.max_failovers,
            }),
            fabric: Arc::from(self.fabric),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
