use crate::{CredentialAccessor, CredentialResolver, EndpointConfig};
use aws_es_core::utils::Redact;
use aws_es_core::{Context, Error, Result};
use log::debug;
use percent_encoding::percent_decode_str;
use std::fmt::{Debug, Formatter};
use url::Url;

/// Port used when the scheme has no well-known one.
const DEFAULT_PORT: u16 = 9200;

/// Address, region and credentials of one endpoint.
#[derive(Clone)]
pub struct HostDescriptor {
    /// Host name without port.
    pub host: String,
    /// Port, explicit or implied by the scheme.
    pub port: u16,
    /// `http` or `https`.
    pub scheme: String,
    /// User from the url userinfo.
    pub user: Option<String>,
    /// Password from the url userinfo.
    pub password: Option<String>,
    /// Path prefix, absent when the url has no path.
    pub path: Option<String>,
    /// Region used in the signing scope.
    pub region: String,
    /// Credentials every request to this host is signed with.
    pub credential_accessor: CredentialAccessor,
}

impl Debug for HostDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostDescriptor")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("scheme", &self.scheme)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(Redact::from))
            .field("path", &self.path)
            .field("region", &self.region)
            .field(
                "credential_accessor",
                &self.credential_accessor.debug_string(),
            )
            .finish()
    }
}

/// Options handed to the client for a static pool of managed endpoints.
///
/// The managed service hides node addresses behind the endpoint, so node
/// discovery and reloading stay disabled.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Hosts in configuration order.
    pub hosts: Vec<HostDescriptor>,
    /// Reload connections periodically.
    pub reload_connections: bool,
    /// Reload connections after a failure.
    pub reload_on_failure: bool,
    /// Sniff nodes on start.
    pub sniff_on_start: bool,
}

impl ConnectionOptions {
    /// Options for a static pool over `hosts`.
    pub fn new(hosts: Vec<HostDescriptor>) -> Self {
        Self {
            hosts,
            reload_connections: false,
            reload_on_failure: false,
            sniff_on_start: false,
        }
    }
}

/// Parsed endpoint url.
#[derive(Debug, Clone, PartialEq, Eq)]
struct EndpointAddress {
    scheme: String,
    host: String,
    port: u16,
    user: Option<String>,
    password: Option<String>,
    path: Option<String>,
}

impl EndpointAddress {
    fn parse(endpoint: &EndpointConfig) -> Result<Self> {
        if endpoint.region.is_empty() {
            return Err(Error::config_invalid("region must not be empty"));
        }
        if endpoint.url.is_empty() {
            return Err(Error::config_invalid("url must not be empty"));
        }
        if endpoint.url.ends_with('/') {
            return Err(Error::config_invalid("url must not end with '/'"));
        }

        // Bare `host[:port]` means plain http.
        let raw = if endpoint.url.contains("://") {
            endpoint.url.clone()
        } else {
            format!("http://{}", endpoint.url)
        };
        let url = Url::parse(&raw)
            .map_err(|e| Error::config_invalid("url is not valid").with_source(e))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| Error::config_invalid("url has no host"))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(DEFAULT_PORT);

        let user = Some(decode(url.username())).filter(|v| !v.is_empty());
        let password = url.password().map(decode).filter(|v| !v.is_empty());
        let path = Some(url.path().to_string()).filter(|v| !v.is_empty() && v != "/");

        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            port,
            user,
            password,
            path,
        })
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// EndpointHostBuilder turns endpoint configs into host descriptors.
#[derive(Debug, Clone)]
pub struct EndpointHostBuilder {
    ctx: Context,
}

impl EndpointHostBuilder {
    /// Create a builder whose credential sources run within `ctx`.
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Check every endpoint without building anything.
    pub fn validate(endpoints: &[EndpointConfig]) -> Result<()> {
        Self::parse_all(endpoints).map(|_| ())
    }

    fn parse_all(endpoints: &[EndpointConfig]) -> Result<Vec<EndpointAddress>> {
        if endpoints.is_empty() {
            return Err(Error::config_invalid("at least one endpoint is required"));
        }

        endpoints
            .iter()
            .enumerate()
            .map(|(idx, ep)| {
                EndpointAddress::parse(ep).map_err(|e| {
                    e.with_context(format!("endpoint: {idx}"))
                        .with_context(format!("url: {}", ep.url))
                })
            })
            .collect()
    }

    /// Build one descriptor per endpoint, in configuration order.
    ///
    /// Every endpoint is validated first, a single bad one rejects the list.
    pub fn build(&self, endpoints: &[EndpointConfig]) -> Result<Vec<HostDescriptor>> {
        let addresses = Self::parse_all(endpoints)?;

        Ok(addresses
            .into_iter()
            .zip(endpoints)
            .map(|(addr, ep)| {
                let resolver = CredentialResolver::new(ep.clone(), self.ctx.clone());
                let descriptor = HostDescriptor {
                    host: addr.host,
                    port: addr.port,
                    scheme: addr.scheme,
                    user: addr.user,
                    password: addr.password,
                    path: addr.path,
                    region: ep.region.clone(),
                    credential_accessor: resolver.accessor(),
                };
                debug!("built host descriptor: {descriptor:?}");
                descriptor
            })
            .collect())
    }
}
