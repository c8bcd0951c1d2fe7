//! AWS SigV4 signing for managed Elasticsearch and OpenSearch domains.
//!
//! This crate provides the AWS [`Credential`], the header based SigV4
//! [`RequestSigner`] and the credential sources a search endpoint can be
//! configured with:
//!
//! - [`StaticCredentialProvider`]: a fixed access key pair
//! - [`ProfileCredentialProvider`]: the shared credentials and config files
//! - [`ImdsCredentialProvider`]: the EC2 instance profile (IMDSv2)
//! - [`EcsCredentialProvider`]: the ECS container credentials endpoint
//! - [`AssumeRoleCredentialProvider`]: STS `AssumeRole`
//! - [`AssumeRoleWithWebIdentityCredentialProvider`]: STS `AssumeRoleWithWebIdentity`
//! - [`ProvideCredentialChain`] and [`DefaultCredentialProvider`]: ordered fallback
//!
//! ## Example
//!
//! ```no_run
//! use aws_es_core::{Context, OsEnv, ProvideCredential, SignRequest};
//! use aws_es_file_read_tokio::TokioFileRead;
//! use aws_es_http_send_reqwest::ReqwestHttpSend;
//! use aws_es_sigv4::{DefaultCredentialProvider, RequestSigner, ES_SERVICE};
//!
//! # async fn example() -> aws_es_core::Result<()> {
//! let ctx = Context::new()
//!     .with_file_read(TokioFileRead)
//!     .with_http_send(ReqwestHttpSend::default())
//!     .with_env(OsEnv);
//!
//! let cred = DefaultCredentialProvider::new().provide_credential(&ctx).await?;
//!
//! let (mut parts, _) = http::Request::get("https://search-x.us-east-1.es.amazonaws.com/_cluster/health")
//!     .body(())
//!     .unwrap()
//!     .into_parts();
//! RequestSigner::new(ES_SERVICE, "us-east-1")
//!     .sign_request(&ctx, &mut parts, cred.as_ref())
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod constants;
pub use constants::{
    AWS_CONTAINER_CREDENTIALS_RELATIVE_URI, ES_SERVICE, STS_SERVICE, X_AMZ_CONTENT_SHA_256,
    X_AMZ_DATE, X_AMZ_SECURITY_TOKEN,
};

mod credential;
pub use credential::{Credential, EXPIRY_BUFFER_SECS};

mod sign_request;
pub use sign_request::RequestSigner;

mod provide_credential;
pub use provide_credential::*;
