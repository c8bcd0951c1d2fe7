use crate::provide_credential::utils::{
    parse_sts_error, sts_base_url, sts_request_id, StsCredentials, STS_API_VERSION,
};
use crate::Credential;
use async_trait::async_trait;
use aws_es_core::{Context, Error, ProvideCredential, Result};
use bytes::Bytes;
use http::{Method, StatusCode};
use log::debug;
use quick_xml::de;
use serde::Deserialize;

/// AssumeRoleWithWebIdentityCredentialProvider exchanges an OIDC token read
/// from a file for temporary role credentials.
///
/// The STS call is unsigned; the token itself authenticates the caller. The
/// token file is read on every refresh since it is rotated by the platform.
///
/// - [AssumeRoleWithWebIdentity](https://docs.aws.amazon.com/STS/latest/APIReference/API_AssumeRoleWithWebIdentity.html)
#[derive(Debug, Clone)]
pub struct AssumeRoleWithWebIdentityCredentialProvider {
    role_arn: String,
    web_identity_token_file: String,
    role_session_name: String,

    region: String,
    endpoint_url: Option<String>,
}

impl AssumeRoleWithWebIdentityCredentialProvider {
    /// Create a new provider for `role_arn` authenticated by `token_file`.
    pub fn new(
        role_arn: impl Into<String>,
        token_file: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            role_arn: role_arn.into(),
            web_identity_token_file: token_file.into(),
            role_session_name: "aws-es".to_string(),
            region: region.into(),
            endpoint_url: None,
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
}

#[async_trait]
impl ProvideCredential for AssumeRoleWithWebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let token_file = ctx
            .expand_home_dir(&self.web_identity_token_file)
            .unwrap_or_else(|| self.web_identity_token_file.clone());
        let token = ctx.file_read_as_string(&token_file).await.map_err(|e| {
            Error::credential_invalid("failed to read web identity token file")
                .with_source(e)
                .with_context(format!("file: {token_file}"))
        })?;
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::credential_invalid("web identity token file is empty")
                .with_context(format!("file: {token_file}")));
        }

        let base_url = sts_base_url(self.endpoint_url.as_deref(), &self.region)
            .map_err(|e| e.with_context(format!("role_arn: {}", self.role_arn)))?;
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", "AssumeRoleWithWebIdentity")
            .append_pair("RoleArn", &self.role_arn)
            .append_pair("RoleSessionName", &self.role_session_name)
            .append_pair("WebIdentityToken", token)
            .append_pair("Version", STS_API_VERSION)
            .finish();
        debug!("assuming role {} with web identity via {base_url}", self.role_arn);

        let req = http::Request::builder()
            .method(Method::GET)
            .uri(format!("{base_url}/?{query}"))
            .body(Bytes::new())
            .map_err(|e| {
                Error::config_invalid("failed to build STS AssumeRoleWithWebIdentity request")
                    .with_source(e)
                    .with_context(format!("role_arn: {}", self.role_arn))
            })?;

        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::provider_unavailable("failed to send AssumeRoleWithWebIdentity request to STS")
                .with_source(e)
                .with_context(format!("role_arn: {}", self.role_arn))
        })?;

        let status = resp.status();
        let request_id = sts_request_id(resp.headers());
        if status != StatusCode::OK {
            return Err(parse_sts_error(
                "AssumeRoleWithWebIdentity",
                status,
                resp.body(),
                request_id.as_deref(),
            )
            .with_context(format!("role_arn: {}", self.role_arn))
            .with_context(format!("token_file: {token_file}")));
        }

        let body = resp.into_body();
        let resp: AssumeRoleWithWebIdentityResponse = de::from_str(&body).map_err(|e| {
            Error::unexpected("failed to parse STS AssumeRoleWithWebIdentity response")
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
struct AssumeRoleWithWebIdentityResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleWithWebIdentityResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResult {
    credentials: StsCredentials,
}
