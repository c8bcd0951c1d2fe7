use crate::CredentialAccessor;
use async_trait::async_trait;
use aws_es_core::hash::hex_sha256;
use aws_es_core::{Context, Error, HttpSend, Result, SignRequest};
use aws_es_sigv4::{
    RequestSigner, ES_SERVICE, X_AMZ_CONTENT_SHA_256, X_AMZ_DATE, X_AMZ_SECURITY_TOKEN,
};
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::HeaderValue;
use log::debug;
use std::sync::Arc;

/// SigningMiddleware signs every request with SigV4 before handing it to the
/// next stage.
///
/// The payload hash covers the exact body bytes that are forwarded. Only the
/// signature headers are touched: `authorization`, `x-amz-date`,
/// `x-amz-content-sha256` and `x-amz-security-token`.
#[derive(Debug)]
pub struct SigningMiddleware {
    ctx: Context,
    accessor: CredentialAccessor,
    signer: RequestSigner,
    inner: Arc<dyn HttpSend>,
}

impl SigningMiddleware {
    /// Sign with credentials from `accessor` for `region`, then forward to `inner`.
    pub fn new(accessor: CredentialAccessor, region: &str, inner: Arc<dyn HttpSend>) -> Self {
        Self {
            ctx: Context::new(),
            accessor,
            signer: RequestSigner::new(ES_SERVICE, region),
            inner,
        }
    }

    /// Sign `req` in place.
    pub async fn sign(&self, req: http::Request<Bytes>) -> Result<http::Request<Bytes>> {
        let cred = self.accessor.resolve().await?;
        if !cred.has_keys() {
            return Err(Error::credential_invalid(
                "resolved credentials lack an access key or secret key",
            )
            .with_context(format!("source: {}", self.accessor.source())));
        }

        let (mut parts, body) = req.into_parts();
        // A retried request still carries the headers of its previous attempt.
        for name in [
            AUTHORIZATION.as_str(),
            X_AMZ_DATE,
            X_AMZ_SECURITY_TOKEN,
            X_AMZ_CONTENT_SHA_256,
        ] {
            parts.headers.remove(name);
        }
        parts.headers.insert(
            X_AMZ_CONTENT_SHA_256,
            HeaderValue::from_str(&hex_sha256(&body))?,
        );

        self.signer
            .sign_request(&self.ctx, &mut parts, Some(&cred))
            .await?;
        debug!("signed {} {}", parts.method, parts.uri);

        Ok(http::Request::from_parts(parts, body))
    }
}

#[async_trait]
impl HttpSend for SigningMiddleware {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = self.sign(req).await?;
        self.inner.http_send(req).await
    }
}
