//! Core components for signing requests to AWS managed search domains.
//!
//! This crate holds the runtime-agnostic pieces: the [`Context`] that
//! carries file, http and environment capabilities, the credential and
//! signing traits, the shared error type and a few hashing, time and
//! redaction helpers.
//!
//! ## Traits
//!
//! - [`FileRead`]: For asynchronous file reading
//! - [`HttpSend`]: For sending HTTP requests
//! - [`Env`]: For environment variable access
//! - [`ProvideCredential`]: For loading credentials from various sources
//! - [`SignRequest`]: For signing a request in place
//! - [`SigningCredential`]: For validating credentials

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

pub mod hash;
pub mod time;
pub mod utils;

mod context;
pub use context::{Context, Env, FileRead, HttpSend, OsEnv, StaticEnv, Unconfigured};

mod error;
pub use error::{Error, ErrorKind, Result};

mod api;
pub use api::{ProvideCredential, SignRequest, SigningCredential};
mod request;
pub use request::SigningRequest;
