use aws_es_core::time::format_iso8601;
use aws_es_core::{Context, Error, ProvideCredential, Result, SigningCredential};
use aws_es_sigv4::Credential;
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// CredentialAccessor is a lazy, memoizing handle on one credential source.
///
/// Nothing is fetched until the first [`CredentialAccessor::resolve`]. After
/// that the cached credential is returned until it comes within the expiry
/// buffer, then the source is asked again. Credentials without an expiration
/// stay cached for the accessor's lifetime.
///
/// A source that reports no credentials at all is not asked again: later
/// calls fail with the same `CredentialNotFound`. Errors from the source are
/// not remembered and the next call retries.
///
/// Clones share the source and the state. Refreshes are serialized on an
/// async lock, so concurrent callers that find the credential expiring wait
/// for one fetch instead of issuing their own.
#[derive(Clone)]
pub struct CredentialAccessor {
    ctx: Context,
    source: Arc<str>,
    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
    state: Arc<Mutex<State>>,
    refresh: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug)]
enum State {
    Unresolved,
    Resolving,
    Resolved(Credential),
    NotFound,
}

impl Debug for CredentialAccessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialAccessor")
            .field("source", &self.source)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl CredentialAccessor {
    /// Create an accessor that runs `provider` within `ctx`.
    ///
    /// `source` names the credential source in logs and errors.
    pub fn new(
        ctx: Context,
        source: impl Into<String>,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        Self {
            ctx,
            source: Arc::from(source.into()),
            provider: Arc::new(provider),
            state: Arc::new(Mutex::new(State::Unresolved)),
            refresh: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Name of the credential source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Return usable credentials, fetching them when none are cached or the
    /// cached ones are about to expire.
    pub async fn resolve(&self) -> Result<Credential> {
        if let Some(cred) = self.cached()? {
            return Ok(cred);
        }

        let _guard = self.refresh.lock().await;
        // Another caller may have finished a refresh while we waited.
        if let Some(cred) = self.cached()? {
            return Ok(cred);
        }

        let previous = self.replace_state(State::Resolving);
        match self.provider.provide_credential(&self.ctx).await {
            Ok(Some(cred)) => {
                debug!("resolved credential from {}: {cred:?}", self.source);
                self.replace_state(State::Resolved(cred.clone()));
                Ok(cred)
            }
            Ok(None) => {
                debug!("no credential from {}, giving up on it", self.source);
                self.replace_state(State::NotFound);
                Err(self.not_found())
            }
            Err(err) => {
                self.replace_state(previous);
                Err(err.with_context(format!("source: {}", self.source)))
            }
        }
    }

    /// Describe the source and the credential state without blocking.
    pub fn debug_string(&self) -> String {
        let state = match &*self.state.lock().expect("lock poisoned") {
            State::Unresolved => "unresolved".to_string(),
            State::Resolving => "resolving".to_string(),
            State::NotFound => "not found".to_string(),
            State::Resolved(cred) if !cred.is_valid() => "expired".to_string(),
            State::Resolved(cred) => match cred.expires_in {
                Some(t) => format!("valid until {}", format_iso8601(t)),
                None => "valid".to_string(),
            },
        };

        format!("{} ({state})", self.source)
    }

    /// Usable cached credential, or `None` when a fetch is needed.
    fn cached(&self) -> Result<Option<Credential>> {
        match &*self.state.lock().expect("lock poisoned") {
            State::Resolved(cred) if cred.is_valid() => Ok(Some(cred.clone())),
            State::Resolved(_) => {
                debug!("credential from {} is expiring, refreshing", self.source);
                Ok(None)
            }
            State::NotFound => Err(self.not_found()),
            State::Unresolved | State::Resolving => {
                debug!("resolving credential from {}", self.source);
                Ok(None)
            }
        }
    }

    fn replace_state(&self, state: State) -> State {
        std::mem::replace(&mut *self.state.lock().expect("lock poisoned"), state)
    }

    fn not_found(&self) -> Error {
        Error::credential_not_found("no credential source produced usable credentials")
            .with_context(format!("source: {}", self.source))
    }
}
