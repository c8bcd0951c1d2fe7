// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::{Error, Result};
use bytes::Bytes;
use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;

/// Context is what credential providers run against.
///
/// Providers never touch the process directly. Shared profile files and web
/// identity tokens come through [`FileRead`], metadata endpoints and STS are
/// reached through [`HttpSend`], and `AWS_*` variables are looked up through
/// [`Env`]. A fresh context has none of these wired: every capability is
/// [`Unconfigured`] until replaced, so a provider that reaches for something
/// the caller did not grant fails instead of silently using the host.
///
/// ## Example
///
/// ```
/// use aws_es_core::{Context, StaticEnv};
/// use std::collections::HashMap;
///
/// let ctx = Context::new().with_env(StaticEnv {
///     home_dir: Some("/home/fluent".into()),
///     envs: HashMap::from([("AWS_CONFIG_FILE".to_string(), "~/aws.conf".to_string())]),
/// });
/// assert_eq!(
///     ctx.resolve_path(None, "AWS_CONFIG_FILE", "~/.aws/config").as_deref(),
///     Some("/home/fluent/aws.conf")
/// );
/// ```
#[derive(Clone)]
pub struct Context {
    files: Arc<dyn FileRead>,
    http: Arc<dyn HttpSend>,
    env: Arc<dyn Env>,
}

impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("files", &self.files)
            .field("http", &self.http)
            .field("env", &self.env)
            .finish()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// Create a context with no capabilities.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Unconfigured),
            http: Arc::new(Unconfigured),
            env: Arc::new(Unconfigured),
        }
    }

    /// Read files through `files`.
    pub fn with_file_read(mut self, files: impl FileRead) -> Self {
        self.files = Arc::new(files);
        self
    }

    /// Send http requests through `http`.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Arc::new(http);
        self
    }

    /// Look up variables and the home dir through `env`.
    pub fn with_env(mut self, env: impl Env) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Read a whole file.
    pub async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        self.files.file_read(path).await
    }

    /// Read a whole file that must hold utf-8 text, such as a token or a
    /// toml document.
    pub async fn file_read_as_string(&self, path: &str) -> Result<String> {
        let bytes = self.file_read(path).await?;
        String::from_utf8(bytes).map_err(|e| {
            Error::unexpected("file content is not valid utf-8")
                .with_context(format!("path: {path}"))
                .with_source(e)
        })
    }

    /// Send a request and collect the response body.
    pub async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        self.http.http_send(req).await
    }

    /// Send a request and collect the response body as text.
    ///
    /// Metadata and STS responses are json or xml, invalid utf-8 is replaced.
    pub async fn http_send_as_string(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<String>> {
        let (parts, body) = self.http_send(req).await?.into_parts();
        let body = String::from_utf8_lossy(&body).into_owned();
        Ok(http::Response::from_parts(parts, body))
    }

    /// Home directory of the current user, if known.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.env.home_dir()
    }

    /// Replace a leading `~` with the home dir.
    ///
    /// Paths without a leading `~/` (or `~\`) come back unchanged. Returns
    /// `None` when expansion is needed but the home dir is unknown.
    pub fn expand_home_dir(&self, path: &str) -> Option<String> {
        match path.strip_prefix('~') {
            Some(rest) if rest.starts_with('/') || rest.starts_with('\\') => self
                .home_dir()
                .map(|home| format!("{}{rest}", home.to_string_lossy())),
            _ => Some(path.to_string()),
        }
    }

    /// Pick a file path the way the AWS tooling does.
    ///
    /// An `explicit` path wins, then a non-empty `env_key` variable, then
    /// `default`. The winner has `~` expanded; `None` means it needed a home
    /// dir that is unknown.
    pub fn resolve_path(
        &self,
        explicit: Option<&str>,
        env_key: &str,
        default: &str,
    ) -> Option<String> {
        match explicit {
            Some(path) => self.expand_home_dir(path),
            None => match self.env_var_non_empty(env_key) {
                Some(path) => self.expand_home_dir(&path),
                None => self.expand_home_dir(default),
            },
        }
    }

    /// Get an environment variable.
    ///
    /// Returns `None` if the variable is not found or is not valid utf-8.
    pub fn env_var(&self, key: &str) -> Option<String> {
        self.env.var(key)
    }

    /// Get an environment variable, treating an empty value as unset.
    pub fn env_var_non_empty(&self, key: &str) -> Option<String> {
        self.env_var(key).filter(|v| !v.is_empty())
    }
}

/// FileRead reads a whole file.
///
/// Shared profiles and web identity token files are read through it.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file at `path` entirely.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}

/// HttpSend sends a fully built http request and returns the collected response.
///
/// Credential providers use it to reach metadata endpoints and STS. The
/// signing middleware also implements it, wrapping the transport that talks
/// to the search domain.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send `req` and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

/// Env looks up environment variables and the home dir.
pub trait Env: Debug + Send + Sync + 'static {
    /// Get an environment variable.
    fn var(&self, key: &str) -> Option<String>;

    /// Home dir of the current user, `None` if unknown.
    fn home_dir(&self) -> Option<PathBuf>;
}

/// Env backed by the real process environment.
#[derive(Debug, Copy, Clone, Default)]
pub struct OsEnv;

impl Env for OsEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var_os(key)?.into_string().ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        home::home_dir()
    }
}

/// StaticEnv is a fixed environment, used in tests.
#[derive(Debug, Clone, Default)]
pub struct StaticEnv {
    /// Home dir to report.
    pub home_dir: Option<PathBuf>,
    /// Variables to report.
    pub envs: std::collections::HashMap<String, String>,
}

impl Env for StaticEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.envs.get(key).cloned()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir.clone()
    }
}

/// Unconfigured stands in for any capability a [`Context`] was not given.
///
/// Reads and sends fail, the environment is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

#[async_trait::async_trait]
impl FileRead for Unconfigured {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        Err(Error::unexpected("context has no file reader")
            .with_context(format!("path: {path}")))
    }
}

#[async_trait::async_trait]
impl HttpSend for Unconfigured {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Err(Error::unexpected("context has no http client")
            .with_context(format!("uri: {}", req.uri())))
    }
}

impl Env for Unconfigured {
    fn var(&self, _: &str) -> Option<String> {
        None
    }

    fn home_dir(&self) -> Option<PathBuf> {
        None
    }
}
