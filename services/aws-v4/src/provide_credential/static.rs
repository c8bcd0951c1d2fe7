use crate::Credential;
use async_trait::async_trait;
use aws_es_core::{Context, ProvideCredential, Result};
use log::debug;

/// StaticCredentialProvider hands out the key pair configured for an endpoint.
///
/// The pair never expires, so an accessor fetches it once. A pair with
/// either key empty yields no credential, which surfaces as
/// `CredentialNotFound` rather than a request signed with a blank key.
#[derive(Debug, Clone)]
pub struct StaticCredentialProvider {
    credential: Credential,
}

impl StaticCredentialProvider {
    /// Create a provider for the given access key id and secret access key.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                access_key_id: access_key_id.into(),
                secret_access_key: secret_access_key.into(),
                session_token: None,
                expires_in: None,
            },
        }
    }

    /// Attach a session token, for keys issued by STS. An empty token is
    /// ignored.
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.credential.session_token = Some(token.into()).filter(|t| !t.is_empty());
        self
    }
}

#[async_trait]
impl ProvideCredential for StaticCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        if !self.credential.has_keys() {
            debug!("static credential is missing its access key or secret key");
            return Ok(None);
        }
        Ok(Some(self.credential.clone()))
    }
}
