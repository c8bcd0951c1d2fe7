use crate::constants::{
    AWS_EC2_METADATA_DISABLED, AWS_EC2_METADATA_SERVICE_ENDPOINT, IMDS_ENDPOINT,
};
use crate::Credential;
use async_trait::async_trait;
use aws_es_core::time::{now, parse_rfc3339, DateTime};
use aws_es_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::debug;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Every IMDS call is attempted at most this many times.
const IMDS_MAX_ATTEMPTS: usize = 2;
/// 21600s (6h) is recommended by AWS.
const IMDS_TOKEN_TTL_SECS: i64 = 21600;

/// ImdsCredentialProvider loads the instance profile credentials from the
/// EC2 instance metadata service, using the IMDSv2 session token flow.
///
/// - The endpoint is `http://169.254.169.254`, or `AWS_EC2_METADATA_SERVICE_ENDPOINT`.
/// - `AWS_EC2_METADATA_DISABLED=true` makes the provider not applicable.
/// - Each call is bounded by a timeout (1s by default) and retried once on
///   transport failure.
#[derive(Debug, Clone)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
    timeout: Duration,
    token: Arc<Mutex<(String, DateTime)>>,
}

impl Default for ImdsCredentialProvider {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(1),
            token: Arc::new(Mutex::new((String::new(), DateTime::default()))),
        }
    }
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the timeout for each metadata request attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| ctx.env_var_non_empty(AWS_EC2_METADATA_SERVICE_ENDPOINT))
            .unwrap_or_else(|| IMDS_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    fn invalidate_token(&self) {
        self.token.lock().expect("lock poisoned").1 = DateTime::default();
    }

    /// Send a request built by `build`, retrying once on timeout or transport failure.
    async fn send(
        &self,
        ctx: &Context,
        operation: &str,
        build: impl Fn() -> Result<http::Request<Bytes>>,
    ) -> Result<http::Response<String>> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let err = match tokio::time::timeout(self.timeout, ctx.http_send_as_string(build()?))
                .await
            {
                Ok(Ok(resp)) => return Ok(resp),
                Ok(Err(e)) => {
                    Error::provider_unavailable("failed to connect to IMDS").with_source(e)
                }
                Err(_) => Error::provider_unavailable("IMDS request timed out")
                    .with_context(format!("timeout: {:?}", self.timeout)),
            };
            let err = err
                .with_context(format!("operation: {operation}"))
                .with_context(format!("attempt: {attempt}"));

            if attempt >= IMDS_MAX_ATTEMPTS {
                return Err(err);
            }
            debug!("retrying IMDS request: {err}");
        }
    }

    async fn load_ec2_metadata_token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, expires_in) = self.token.lock().expect("lock poisoned").clone();
            if expires_in > now() {
                return Ok(token);
            }
        }

        let url = format!("{}/latest/api/token", self.get_endpoint(ctx));
        let resp = self
            .send(ctx, "fetch_imds_token", || {
                Ok(http::Request::builder()
                    .uri(&url)
                    .method(Method::PUT)
                    .header(CONTENT_LENGTH, "0")
                    .header(
                        "x-aws-ec2-metadata-token-ttl-seconds",
                        IMDS_TOKEN_TTL_SECS.to_string(),
                    )
                    .body(Bytes::new())?)
            })
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(parse_imds_error(
                "fetch_imds_token",
                resp.status(),
                resp.body(),
            ));
        }
        let ec2_token = resp.into_body();
        // Refresh the token 10 minutes before IMDS drops it.
        let expires_in = now() + chrono::TimeDelta::seconds(IMDS_TOKEN_TTL_SECS)
            - chrono::TimeDelta::seconds(600);

        {
            *self.token.lock().expect("lock poisoned") = (ec2_token.clone(), expires_in);
        }

        Ok(ec2_token)
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let disabled = ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if disabled {
            debug!("IMDS is disabled by {AWS_EC2_METADATA_DISABLED}");
            return Ok(None);
        }

        let token = self.load_ec2_metadata_token(ctx).await?;
        let endpoint = self.get_endpoint(ctx);

        // List all credentials that node has.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/");
        let resp = self
            .send(ctx, "list_instance_profiles", || {
                Ok(http::Request::builder()
                    .uri(&url)
                    .method(Method::GET)
                    .header("x-aws-ec2-metadata-token", &token)
                    .body(Bytes::new())?)
            })
            .await?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => {
                debug!("no IAM role attached to this instance");
                return Ok(None);
            }
            status => {
                if status == StatusCode::UNAUTHORIZED {
                    self.invalidate_token();
                }
                return Err(parse_imds_error(
                    "list_instance_profiles",
                    status,
                    resp.body(),
                ));
            }
        }

        let profile_name = resp
            .into_body()
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        if profile_name.is_empty() {
            debug!("no IAM role attached to this instance");
            return Ok(None);
        }

        // Get the credentials via role_name.
        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/{profile_name}");
        let resp = self
            .send(ctx, "fetch_credentials", || {
                Ok(http::Request::builder()
                    .uri(&url)
                    .method(Method::GET)
                    .header("x-aws-ec2-metadata-token", &token)
                    .body(Bytes::new())?)
            })
            .await?;

        if resp.status() != StatusCode::OK {
            if resp.status() == StatusCode::UNAUTHORIZED {
                self.invalidate_token();
            }
            return Err(
                parse_imds_error("fetch_credentials", resp.status(), resp.body())
                    .with_context(format!("profile: {profile_name}")),
            );
        }

        let content = resp.into_body();
        let resp: Ec2MetadataIamSecurityCredentials =
            serde_json::from_str(&content).map_err(|e| {
                Error::unexpected("failed to parse IMDS credentials response")
                    .with_source(e)
                    .with_context(format!("profile: {profile_name}"))
            })?;

        match resp.code.as_str() {
            "Success" => {}
            "AssumeRoleUnauthorizedAccess" => {
                return Err(Error::credential_denied(format!(
                    "EC2 instance not authorized to assume role: {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
            code => {
                return Err(Error::unexpected(format!(
                    "IMDS returned error: [{code}] {}",
                    resp.message
                ))
                .with_context(format!("profile: {profile_name}")));
            }
        }

        let expires_in = parse_rfc3339(&resp.expiration)
            .map_err(|e| e.with_context(format!("profile: {profile_name}")))?;

        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(expires_in),
        }))
    }
}

fn parse_imds_error(operation: &str, status: StatusCode, body: &str) -> Error {
    let message = format!("IMDS {operation} failed with status {status}");
    let err = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::credential_denied(message),
        s if s.is_server_error() => Error::provider_unavailable(message),
        _ => Error::unexpected(message),
    };

    if body.is_empty() {
        err
    } else {
        err.with_context(format!("body: {body}"))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct Ec2MetadataIamSecurityCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}
