use crate::constants::{STS_SERVICE, X_AMZ_CONTENT_SHA_256};
use crate::provide_credential::utils::{
    parse_sts_error, sts_base_url, sts_request_id, StsCredentials, STS_API_VERSION,
};
use crate::provide_credential::DefaultCredentialProvider;
use crate::{Credential, RequestSigner};
use async_trait::async_trait;
use aws_es_core::hash::EMPTY_STRING_SHA256;
use aws_es_core::{Context, Error, ProvideCredential, Result, SignRequest};
use bytes::Bytes;
use http::{Method, StatusCode};
use log::debug;
use quick_xml::de;
use serde::Deserialize;

/// Lifetime requested for assumed role sessions.
const SESSION_DURATION_SECS: u32 = 3600;

/// AssumeRoleCredentialProvider exchanges base credentials for temporary
/// role credentials through STS `AssumeRole`.
///
/// The request is signed with credentials from the base provider, the
/// [`DefaultCredentialProvider`] unless replaced, and sent to the regional
/// STS endpoint or an explicit endpoint url.
///
/// - [AssumeRole](https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRole.html)
#[derive(Debug)]
pub struct AssumeRoleCredentialProvider {
    role_arn: String,
    role_session_name: String,

    region: String,
    endpoint_url: Option<String>,

    base_provider: Box<dyn ProvideCredential<Credential = Credential>>,
}

impl AssumeRoleCredentialProvider {
    /// Create a new assume role provider for `role_arn`, calling STS in `region`.
    pub fn new(role_arn: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            role_session_name: "aws-es".to_string(),
            region: region.into(),
            endpoint_url: None,
            base_provider: Box::new(DefaultCredentialProvider::new()),
        }
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = name.into();
        self
    }

    /// Send STS requests to this url instead of the regional endpoint.
    pub fn with_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint_url = Some(url.into());
        self
    }

    /// Replace the provider of the credentials that sign the STS request.
    pub fn with_base_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.base_provider = Box::new(provider);
        self
    }

    fn request_url(&self) -> Result<String> {
        let base_url = sts_base_url(self.endpoint_url.as_deref(), &self.region)
            .map_err(|e| e.with_context(format!("role_arn: {}", self.role_arn)))?;

        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("Action", "AssumeRole")
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.role_session_name)
            .append_pair("Version", STS_API_VERSION)
            .append_pair("DurationSeconds", &SESSION_DURATION_SECS.to_string());

        Ok(format!("{base_url}/?{}", query.finish()))
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let base = self
            .base_provider
            .provide_credential(ctx)
            .await?
            .filter(|c| c.has_keys())
            .ok_or_else(|| {
                Error::credential_not_found("no base credentials to sign STS AssumeRole")
                    .with_context(format!("role_arn: {}", self.role_arn))
            })?;

        let url = self.request_url()?;
        debug!("assuming role {} via {url}", self.role_arn);

        let req = http::Request::builder()
            .method(Method::GET)
            .uri(&url)
            .header(X_AMZ_CONTENT_SHA_256, EMPTY_STRING_SHA256)
            .body(Bytes::new())
            .map_err(|e| {
                Error::config_invalid("failed to build STS AssumeRole request")
                    .with_source(e)
                    .with_context(format!("role_arn: {}", self.role_arn))
            })?;

        let (mut parts, body) = req.into_parts();
        RequestSigner::new(STS_SERVICE, &self.region)
            .sign_request(ctx, &mut parts, Some(&base))
            .await?;
        let req = http::Request::from_parts(parts, body);

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::provider_unavailable("failed to send AssumeRole request to STS")
                .with_source(e)
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;

        let status = resp.status();
        let request_id = sts_request_id(resp.headers());
        if status != StatusCode::OK {
            return Err(
                parse_sts_error("AssumeRole", status, resp.body(), request_id.as_deref())
                    .with_context(format!("role_arn: {}", self.role_arn))
                    .with_context(format!("session_name: {}", self.role_session_name)),
            );
        }

        let body = resp.into_body();
        let resp: AssumeRoleResponse = de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRole response")
                .with_source(e)
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;

        resp.result
            .credentials
            .into_credential()
            .map(Some)
            .map_err(|e| e.with_context(format!("role_arn: {}", self.role_arn)))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResponse {
    #[serde(rename = "AssumeRoleResult")]
    result: AssumeRoleResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: StsCredentials,
}
