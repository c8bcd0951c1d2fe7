use crate::constants::{AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, ECS_ENDPOINT};
use crate::Credential;
use async_trait::async_trait;
use aws_es_core::time::parse_rfc3339;
use aws_es_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::{Method, StatusCode};
use log::debug;
use serde::Deserialize;
use std::time::Duration;

/// EcsCredentialProvider loads credentials from the container credentials
/// endpoint available to ECS tasks.
///
/// The relative URI comes from [`EcsCredentialProvider::with_relative_uri`] or
/// the `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` environment variable. Without
/// either the provider is not applicable.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Clone)]
pub struct EcsCredentialProvider {
    relative_uri: Option<String>,
    endpoint: String,
    timeout: Duration,
}

impl Default for EcsCredentialProvider {
    fn default() -> Self {
        Self {
            relative_uri: None,
            endpoint: ECS_ENDPOINT.to_string(),
            timeout: Duration::from_secs(2),
        }
    }
}

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relative URI, taking precedence over the environment.
    pub fn with_relative_uri(mut self, relative_uri: impl Into<String>) -> Self {
        self.relative_uri = Some(relative_uri.into());
        self
    }

    /// Set the container credentials endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the timeout for the credentials request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn relative_uri(&self, ctx: &Context) -> Option<String> {
        self.relative_uri
            .clone()
            .filter(|v| !v.is_empty())
            .or_else(|| ctx.env_var_non_empty(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI))
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(relative_uri) = self.relative_uri(ctx) else {
            debug!("no container credentials relative uri found");
            return Ok(None);
        };

        let url = if relative_uri.starts_with('/') {
            format!("{}{relative_uri}", self.endpoint)
        } else {
            format!("{}/{relative_uri}", self.endpoint)
        };

        let req = http::Request::builder()
            .uri(&url)
            .method(Method::GET)
            .body(Bytes::new())
            .map_err(|e| {
                Error::config_invalid("invalid container credentials uri")
                    .with_context(format!("url: {url}"))
                    .with_source(e)
            })?;

        let resp = match tokio::time::timeout(self.timeout, ctx.http_send_as_string(req)).await {
            Ok(resp) => resp.map_err(|e| {
                Error::provider_unavailable("failed to connect to container credentials endpoint")
                    .with_context(format!("url: {url}"))
                    .with_source(e)
            })?,
            Err(_) => {
                return Err(Error::provider_unavailable(
                    "container credentials request timed out",
                )
                .with_context(format!("url: {url}"))
                .with_context(format!("timeout: {:?}", self.timeout)))
            }
        };

        let status = resp.status();
        if status != StatusCode::OK {
            let message = format!("container credentials endpoint returned status {status}");
            let err = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    Error::credential_denied(message)
                }
                s if s.is_server_error() => Error::provider_unavailable(message),
                _ => Error::unexpected(message),
            };
            return Err(err.with_context(format!("url: {url}")));
        }

        let content = resp.into_body();
        let cred: EcsTaskCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse container credentials").with_source(e)
        })?;

        let expires_in = parse_rfc3339(&cred.expiration)?;

        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: Some(cred.token),
            expires_in: Some(expires_in),
        }))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EcsTaskCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,
}
