use crate::{
    default_context, reqwest_client, Config, ConnectionFactory, ConnectionOptions,
    ConnectionPool, EndpointHostBuilder, HostDescriptor, RandomSelector, RoundRobinSelector,
    SelectorKind,
};
use aws_es_core::{Context, HttpSend, Result};
use aws_es_http_send_reqwest::ReqwestHttpSend;
use log::info;

/// AwsElasticsearchService wires configuration, credentials and signing
/// connections together for a client of managed search domains.
///
/// - [`AwsElasticsearchService::configure`] validates the whole config and
///   builds the host descriptors. Nothing is fetched over the network yet.
/// - [`AwsElasticsearchService::connection_options`] describes the static pool.
/// - [`AwsElasticsearchService::connect`] builds the signing pool.
#[derive(Debug)]
pub struct AwsElasticsearchService {
    config: Config,
    hosts: Vec<HostDescriptor>,
}

impl AwsElasticsearchService {
    /// Configure with credential sources running in the OS environment.
    pub fn configure(config: Config) -> Result<Self> {
        config.validate()?;
        let ctx = default_context(config.credential_timeout())?;

        Self::configure_with_context(config, ctx)
    }

    /// Configure with credential sources running within `ctx`.
    pub fn configure_with_context(config: Config, ctx: Context) -> Result<Self> {
        config.validate()?;
        let hosts = EndpointHostBuilder::new(ctx).build(&config.endpoints)?;
        for host in &hosts {
            info!(
                "configured endpoint {}://{}:{} in {} with {}",
                host.scheme,
                host.host,
                host.port,
                host.region,
                host.credential_accessor.debug_string()
            );
        }

        Ok(Self { config, hosts })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Host descriptors in configuration order.
    pub fn hosts(&self) -> &[HostDescriptor] {
        &self.hosts
    }

    /// Static host list with discovery and reloading disabled.
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions::new(self.hosts.clone())
    }

    /// Build the signing pool over a reqwest client bounded by the request timeout.
    pub fn connect(&self) -> Result<ConnectionPool> {
        let client = reqwest_client(self.config.request_timeout())?;

        Ok(self.connect_with(ReqwestHttpSend::new(client)))
    }

    /// Build the signing pool over `inner`.
    pub fn connect_with(&self, inner: impl HttpSend) -> ConnectionPool {
        let factory = ConnectionFactory::new(inner);
        let factory = match self.config.selector {
            SelectorKind::RoundRobin => factory.with_selector(RoundRobinSelector::new()),
            SelectorKind::Random => factory.with_selector(RandomSelector),
        };

        factory.build(self.hosts.clone())
    }
}
