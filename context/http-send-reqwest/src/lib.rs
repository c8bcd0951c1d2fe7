//! Reqwest-based HTTP client for the search domain signer.
//!
//! `ReqwestHttpSend` implements [`HttpSend`] with a [`reqwest::Client`]. It is
//! used both by credential providers talking to metadata endpoints or STS and
//! as the inner transport behind the signing middleware.
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use aws_es_core::Context;
//! use aws_es_http_send_reqwest::ReqwestHttpSend;
//! use reqwest::Client;
//!
//! let client = Client::builder()
//!     .timeout(Duration::from_secs(60))
//!     .build()
//!     .unwrap();
//!
//! let ctx = Context::new().with_http_send(ReqwestHttpSend::new(client));
//! ```

use async_trait::async_trait;
use aws_es_core::{Error, HttpSend, Result};
use bytes::Bytes;
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Default, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a configured client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let uri = req.uri().to_string();
        let req = Request::try_from(req).map_err(|e| {
            Error::request_invalid("failed to convert http request")
                .with_context(format!("uri: {uri}"))
                .with_source(e)
        })?;

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| transport_error(e, &uri))?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| transport_error(e, &uri))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

/// Timeouts and connection failures are worth retrying, anything else is not.
fn transport_error(e: reqwest::Error, uri: &str) -> Error {
    let err = if e.is_timeout() || e.is_connect() {
        Error::provider_unavailable("http request failed to complete")
    } else {
        Error::unexpected("http request failed")
    };

    err.with_context(format!("uri: {uri}")).with_source(e)
}
