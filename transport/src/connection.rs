use crate::{HostDescriptor, RoundRobinSelector, Selector, SigningMiddleware};
use aws_es_core::{HttpSend, Result};
use bytes::Bytes;
use http::Method;
use log::info;
use std::sync::Arc;

/// Connection to one host. Every request sent through it is signed.
#[derive(Debug, Clone)]
pub struct Connection {
    host: HostDescriptor,
    url: String,
    transport: Arc<SigningMiddleware>,
}

impl Connection {
    /// Create a connection that signs for `host` and forwards to `inner`.
    pub fn new(host: HostDescriptor, inner: Arc<dyn HttpSend>) -> Self {
        let mut url = format!("{}://{}:{}", host.scheme, host.host, host.port);
        if let Some(path) = &host.path {
            url.push_str(path);
        }

        let transport = Arc::new(SigningMiddleware::new(
            host.credential_accessor.clone(),
            &host.region,
            inner,
        ));

        Self {
            host,
            url,
            transport,
        }
    }

    /// Descriptor this connection was built from.
    pub fn host(&self) -> &HostDescriptor {
        &self.host
    }

    /// Base url: `scheme://host:port[/path]`.
    ///
    /// Userinfo is left out, the `authorization` header belongs to SigV4.
    pub fn full_url(&self) -> &str {
        &self.url
    }

    /// Start a request to `path_and_query` under the base url.
    pub fn request(&self, method: Method, path_and_query: &str) -> http::request::Builder {
        let sep = if path_and_query.starts_with('/') { "" } else { "/" };

        http::Request::builder()
            .method(method)
            .uri(format!("{}{sep}{path_and_query}", self.url))
    }

    /// Sign `req` and send it.
    pub async fn send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.transport.http_send(req).await
    }
}

/// Static set of connections plus the selector that picks among them.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    connections: Vec<Connection>,
    selector: Arc<dyn Selector>,
}

impl ConnectionPool {
    /// Pick the connection for the next request.
    pub fn select(&self) -> Option<&Connection> {
        if self.connections.is_empty() {
            return None;
        }

        self.connections
            .get(self.selector.select(self.connections.len()))
    }

    /// All connections in configuration order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether the pool has no connection.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

/// ConnectionFactory wraps a shared network stage into one signing
/// connection per host.
#[derive(Debug, Clone)]
pub struct ConnectionFactory {
    inner: Arc<dyn HttpSend>,
    selector: Arc<dyn Selector>,
}

impl ConnectionFactory {
    /// Create a factory over `inner`, selecting round robin.
    pub fn new(inner: impl HttpSend) -> Self {
        Self {
            inner: Arc::new(inner),
            selector: Arc::new(RoundRobinSelector::new()),
        }
    }

    /// Use `selector` to pick connections.
    pub fn with_selector(mut self, selector: impl Selector) -> Self {
        self.selector = Arc::new(selector);
        self
    }

    /// Build the pool, one connection per host in the given order.
    pub fn build(&self, hosts: Vec<HostDescriptor>) -> ConnectionPool {
        let connections: Vec<_> = hosts
            .into_iter()
            .map(|host| Connection::new(host, self.inner.clone()))
            .collect();
        info!(
            "built signing connection pool: [{}]",
            connections
                .iter()
                .map(|c| c.full_url())
                .collect::<Vec<_>>()
                .join(", ")
        );

        ConnectionPool {
            connections,
            selector: self.selector.clone(),
        }
    }
}
