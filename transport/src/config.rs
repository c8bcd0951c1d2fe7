use aws_es_core::utils::Redact;
use aws_es_core::{Context, Error, Result};
use serde::Deserialize;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

fn default_session_name() -> String {
    "fluentd".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_credential_timeout_secs() -> u64 {
    5
}

/// Connection and credential settings of one search domain endpoint.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointConfig {
    /// Region the domain lives in, used in the signing scope.
    pub region: String,
    /// Endpoint url, for example `https://search-x.us-east-1.es.amazonaws.com`.
    pub url: String,
    /// Static access key id.
    #[serde(default)]
    pub access_key_id: String,
    /// Static secret access key.
    #[serde(default)]
    pub secret_access_key: String,
    /// Role to assume through STS.
    #[serde(default)]
    pub assume_role_arn: Option<String>,
    /// Session name used when assuming a role.
    #[serde(default = "default_session_name")]
    pub assume_role_session_name: String,
    /// OIDC token file, switches the role assumption to web identity.
    #[serde(default)]
    pub web_identity_token_file: Option<String>,
    /// Container credentials path under the ECS credentials endpoint.
    #[serde(default)]
    pub ecs_relative_uri: Option<String>,
    /// Region of the STS endpoint, defaults to `region`.
    #[serde(default)]
    pub sts_region: Option<String>,
    /// Full STS endpoint url, overriding the regional one.
    #[serde(default)]
    pub sts_endpoint_url: Option<String>,
}

impl Debug for EndpointConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("region", &self.region)
            .field("url", &self.url)
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("assume_role_arn", &self.assume_role_arn)
            .field("assume_role_session_name", &self.assume_role_session_name)
            .field("web_identity_token_file", &self.web_identity_token_file)
            .field("ecs_relative_uri", &self.ecs_relative_uri)
            .field("sts_region", &self.sts_region)
            .field("sts_endpoint_url", &self.sts_endpoint_url)
            .finish()
    }
}

impl EndpointConfig {
    /// Create an endpoint that resolves credentials from the default chain.
    pub fn new(region: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            url: url.into(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            assume_role_arn: None,
            assume_role_session_name: default_session_name(),
            web_identity_token_file: None,
            ecs_relative_uri: None,
            sts_region: None,
            sts_endpoint_url: None,
        }
    }

    /// Use static keys.
    pub fn with_static_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    /// Assume `role_arn` through STS.
    pub fn with_assume_role(mut self, role_arn: impl Into<String>) -> Self {
        self.assume_role_arn = Some(role_arn.into());
        self
    }

    /// Set the session name used when assuming a role.
    pub fn with_assume_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.assume_role_session_name = name.into();
        self
    }

    /// Assume the role with the OIDC token stored in `path`.
    pub fn with_web_identity_token_file(mut self, path: impl Into<String>) -> Self {
        self.web_identity_token_file = Some(path.into());
        self
    }

    /// Fetch container credentials from `relative_uri`.
    pub fn with_ecs_relative_uri(mut self, relative_uri: impl Into<String>) -> Self {
        self.ecs_relative_uri = Some(relative_uri.into());
        self
    }

    /// Talk to STS in `region` instead of the domain region.
    pub fn with_sts_region(mut self, region: impl Into<String>) -> Self {
        self.sts_region = Some(region.into());
        self
    }

    /// Talk to STS at `url`.
    pub fn with_sts_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.sts_endpoint_url = Some(url.into());
        self
    }
}

/// Strategy used to pick a connection for the next request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectorKind {
    /// Cycle through connections in configuration order.
    #[default]
    RoundRobin,
    /// Pick a connection uniformly at random.
    Random,
}

/// Output level configuration: the endpoints and the knobs shared by them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Endpoints in the order connections are built.
    pub endpoints: Vec<EndpointConfig>,
    /// Timeout of every request sent to the domain.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Timeout of every call to metadata endpoints and STS.
    #[serde(default = "default_credential_timeout_secs")]
    pub credential_timeout_secs: u64,
    /// Connection selection strategy.
    #[serde(default)]
    pub selector: SelectorKind,
}

impl Config {
    /// Create a config with default knobs.
    pub fn new(endpoints: Vec<EndpointConfig>) -> Self {
        Self {
            endpoints,
            request_timeout_secs: default_request_timeout_secs(),
            credential_timeout_secs: default_credential_timeout_secs(),
            selector: SelectorKind::default(),
        }
    }

    /// Parse config from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::config_invalid("failed to parse config").with_source(e))
    }

    /// Load config from a TOML file read through `ctx`.
    ///
    /// A leading `~` in `path` is expanded with the context's home dir.
    pub async fn from_path(ctx: &Context, path: &str) -> Result<Self> {
        let expanded = ctx.expand_home_dir(path).ok_or_else(|| {
            Error::config_invalid("home dir is unknown, cannot expand config path")
                .with_context(format!("path: {path}"))
        })?;
        let content = ctx.file_read_as_string(&expanded).await.map_err(|e| {
            Error::config_invalid("failed to read config file")
                .with_context(format!("path: {expanded}"))
                .with_source(e)
        })?;

        Self::from_toml_str(&content).map_err(|e| e.with_context(format!("path: {expanded}")))
    }

    /// Timeout of every request sent to the domain.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout of every call to metadata endpoints and STS.
    pub fn credential_timeout(&self) -> Duration {
        Duration::from_secs(self.credential_timeout_secs)
    }

    /// Check the whole config, endpoints included, without touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout_secs == 0 {
            return Err(Error::config_invalid("request_timeout_secs must be positive"));
        }
        if self.credential_timeout_secs == 0 {
            return Err(Error::config_invalid(
                "credential_timeout_secs must be positive",
            ));
        }

        crate::EndpointHostBuilder::validate(&self.endpoints)
    }
}
