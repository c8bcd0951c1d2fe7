use crate::constants::{AWS_CONFIG_FILE, AWS_PROFILE, AWS_SHARED_CREDENTIALS_FILE};
use crate::Credential;
use async_trait::async_trait;
use aws_es_core::{Context, Error, ProvideCredential, Result};
use ini::Ini;
use log::debug;

/// ProfileCredentialProvider loads static keys from the shared AWS files.
///
/// Files are searched in order:
///
/// - `~/.aws/credentials` (or the path specified by `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path specified by `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. The `AWS_PROFILE` environment variable
/// 2. The profile specified via `with_profile()`
/// 3. Default to "default"
///
/// Missing files or profiles make the provider not applicable, while a file
/// that exists but can not be parsed is an error.
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_ini(
        &self,
        ctx: &Context,
        explicit: Option<&str>,
        env_key: &str,
        default: &str,
    ) -> Result<Option<Ini>> {
        let Some(expanded_path) = ctx.resolve_path(explicit, env_key, default) else {
            debug!("no home dir to locate profile file {default}");
            return Ok(None);
        };

        let content = match ctx.file_read(&expanded_path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read profile file {expanded_path}: {err}");
                return Ok(None);
            }
        };

        Ini::load_from_str(&String::from_utf8_lossy(&content))
            .map(Some)
            .map_err(|e| {
                Error::unexpected("failed to parse profile file")
                    .with_context(format!("path: {expanded_path}"))
                    .with_source(e)
            })
    }

    async fn load_from_credentials_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let Some(conf) = self
            .load_ini(
                ctx,
                self.credentials_file.as_deref(),
                AWS_SHARED_CREDENTIALS_FILE,
                "~/.aws/credentials",
            )
            .await?
        else {
            return Ok(None);
        };

        match conf.section(Some(profile)) {
            Some(props) => Ok(credential_from_props(props)),
            None => {
                debug!("profile {profile} not found in credentials file");
                Ok(None)
            }
        }
    }

    async fn load_from_config_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let Some(conf) = self
            .load_ini(
                ctx,
                self.config_file.as_deref(),
                AWS_CONFIG_FILE,
                "~/.aws/config",
            )
            .await?
        else {
            return Ok(None);
        };

        let section = match profile {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };

        match conf.section(Some(&section)) {
            Some(props) => Ok(credential_from_props(props)),
            None => {
                debug!("section {section} not found in config file");
                Ok(None)
            }
        }
    }
}

fn credential_from_props(props: &ini::Properties) -> Option<Credential> {
    match (
        props.get("aws_access_key_id"),
        props.get("aws_secret_access_key"),
    ) {
        (Some(ak), Some(sk)) => Some(Credential {
            access_key_id: ak.to_string(),
            secret_access_key: sk.to_string(),
            session_token: props.get("aws_session_token").map(|s| s.to_string()),
            expires_in: None,
        }),
        _ => None,
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var_non_empty(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // Try credentials file first
        if let Some(cred) = self.load_from_credentials_file(ctx, &profile).await? {
            return Ok(Some(cred));
        }

        // Then try config file
        self.load_from_config_file(ctx, &profile).await
    }
}
