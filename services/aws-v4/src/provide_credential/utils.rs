use crate::Credential;
use aws_es_core::time::parse_rfc3339;
use aws_es_core::utils::Redact;
use aws_es_core::{Error, Result};
use http::StatusCode;
use quick_xml::de;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// Version of the STS query API.
pub const STS_API_VERSION: &str = "2011-06-15";

/// Get the regional sts endpoint host.
///
/// China regions live under `amazonaws.com.cn`.
pub fn sts_endpoint(region: &str) -> Result<String> {
    if region.is_empty() {
        return Err(Error::config_invalid("regional STS endpoint requires region"));
    }

    if region.starts_with("cn-") {
        Ok(format!("sts.{region}.amazonaws.com.cn"))
    } else {
        Ok(format!("sts.{region}.amazonaws.com"))
    }
}

/// Resolve the base url STS requests are sent to.
///
/// An explicit `endpoint_url` wins over the regional endpoint.
pub fn sts_base_url(endpoint_url: Option<&str>, region: &str) -> Result<String> {
    match endpoint_url.filter(|v| !v.is_empty()) {
        Some(url) => Ok(url.trim_end_matches('/').to_string()),
        None => Ok(format!("https://{}", sts_endpoint(region)?)),
    }
}

/// Extract the request id STS returns for support lookups.
pub fn sts_request_id(headers: &http::HeaderMap) -> Option<String> {
    headers
        .get("x-amzn-requestid")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorResponse {
    error: StsErrorDetail,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct StsErrorDetail {
    code: String,
    message: String,
}

/// Turn a non-200 STS response into an [`Error`] of the matching kind.
pub fn parse_sts_error(
    action: &str,
    status: StatusCode,
    body: &str,
    request_id: Option<&str>,
) -> Error {
    let detail = de::from_str::<StsErrorResponse>(body)
        .map(|v| v.error)
        .unwrap_or_default();

    let message = if detail.code.is_empty() {
        format!("STS {action} failed with status {status}")
    } else {
        format!("STS {action} failed: [{}] {}", detail.code, detail.message)
    };

    let err = match (status, detail.code.as_str()) {
        (StatusCode::FORBIDDEN, _) | (_, "AccessDenied") => Error::credential_denied(message),
        (_, "ExpiredTokenException" | "InvalidIdentityToken" | "InvalidClientTokenId") => {
            Error::credential_invalid(message)
        }
        (_, "Throttling" | "IDPCommunicationError") => Error::provider_unavailable(message),
        (s, _) if s.is_server_error() => Error::provider_unavailable(message),
        _ => Error::unexpected(message),
    };

    let err = err.with_context(format!("status: {status}"));
    match request_id {
        Some(id) => err.with_context(format!("request_id: {id}")),
        None => err,
    }
}

/// Credentials block shared by every STS response.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct StsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

impl Debug for StsCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StsCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expiration", &self.expiration)
            .finish()
    }
}

impl StsCredentials {
    /// Convert into a [`Credential`], parsing the expiration.
    pub fn into_credential(self) -> Result<Credential> {
        let expires_in = parse_rfc3339(&self.expiration).map_err(|e| {
            e.with_context(format!("expiration_value: {}", self.expiration))
        })?;

        Ok(Credential {
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            session_token: Some(self.session_token.trim().to_string()),
            expires_in: Some(expires_in),
        })
    }
}
