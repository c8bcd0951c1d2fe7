//! SigV4-signed connections for AWS managed Elasticsearch and OpenSearch domains.
//!
//! Every request dispatched through a [`Connection`] is signed with AWS
//! Signature Version 4 for the `es` service, using credentials resolved per
//! endpoint:
//!
//! 1. Static keys when both `access_key_id` and `secret_access_key` are set.
//! 2. The default chain (shared profile, instance metadata, container
//!    credentials) when no role is configured.
//! 3. STS `AssumeRoleWithWebIdentity` when a token file is set, STS
//!    `AssumeRole` otherwise.
//!
//! Credentials are resolved lazily on the first request and refreshed when
//! they are about to expire.
//!
//! ## Example
//!
//! ```no_run
//! use aws_es_transport::{AwsElasticsearchService, Config};
//! use http::Method;
//!
//! # async fn example() -> aws_es_core::Result<()> {
//! let config = Config::from_toml_str(
//!     r#"
//! [[endpoints]]
//! region = "us-east-1"
//! url = "https://search-logs.us-east-1.es.amazonaws.com"
//! "#,
//! )?;
//!
//! let service = AwsElasticsearchService::configure(config)?;
//! let pool = service.connect()?;
//!
//! let conn = pool.select().expect("pool is never empty");
//! let req = conn
//!     .request(Method::GET, "/_cluster/health")
//!     .body(bytes::Bytes::new())?;
//! let resp = conn.send(req).await?;
//! println!("cluster health: {}", resp.status());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod accessor;
pub use accessor::CredentialAccessor;

mod config;
pub use config::{Config, EndpointConfig, SelectorKind};

mod connection;
pub use connection::{Connection, ConnectionFactory, ConnectionPool};

mod host;
pub use host::{ConnectionOptions, EndpointHostBuilder, HostDescriptor};

mod middleware;
pub use middleware::SigningMiddleware;

mod resolver;
pub use resolver::{CredentialResolver, Selection};

mod selector;
pub use selector::{RandomSelector, RoundRobinSelector, Selector};

mod service;
pub use service::AwsElasticsearchService;

use aws_es_core::{Context, Error, OsEnv, Result};
use aws_es_file_read_tokio::TokioFileRead;
use aws_es_http_send_reqwest::ReqwestHttpSend;
use std::time::Duration;

/// Build a reqwest client whose every request is bounded by `timeout`.
pub fn reqwest_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| {
            Error::unexpected("failed to build http client")
                .with_context(format!("timeout: {timeout:?}"))
                .with_source(e)
        })
}

/// Create the context credential sources run in.
///
/// It reads files through tokio, looks up the OS environment and talks to
/// metadata endpoints and STS through reqwest with `timeout` on every call.
pub fn default_context(timeout: Duration) -> Result<Context> {
    Ok(Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::new(reqwest_client(timeout)?))
        .with_env(OsEnv))
}
