use crate::{CredentialAccessor, EndpointConfig};
use aws_es_core::Context;
use aws_es_sigv4::{
    AssumeRoleCredentialProvider, AssumeRoleWithWebIdentityCredentialProvider,
    DefaultCredentialProvider, EcsCredentialProvider, ImdsCredentialProvider,
    ProfileCredentialProvider, ProvideCredentialChain, StaticCredentialProvider,
    AWS_CONTAINER_CREDENTIALS_RELATIVE_URI,
};
use log::debug;
use once_cell::sync::OnceCell;

/// Credential source picked for an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Both static keys are configured.
    Static,
    /// No role configured: shared profile, then instance metadata, then
    /// container credentials when a relative uri is known.
    DefaultChain {
        /// Container credentials take part in the chain.
        ecs: bool,
    },
    /// STS `AssumeRole` signed with credentials from the default chain.
    AssumeRole {
        /// Role to assume.
        role_arn: String,
        /// Region of the STS endpoint.
        region: String,
    },
    /// STS `AssumeRoleWithWebIdentity` with the token read from a file.
    AssumeRoleWithWebIdentity {
        /// Role to assume.
        role_arn: String,
        /// File holding the OIDC token.
        token_file: String,
        /// Region of the STS endpoint.
        region: String,
    },
}

impl Selection {
    fn name(&self) -> &'static str {
        match self {
            Selection::Static => "static",
            Selection::DefaultChain { .. } => "default_chain",
            Selection::AssumeRole { .. } => "assume_role",
            Selection::AssumeRoleWithWebIdentity { .. } => "assume_role_with_web_identity",
        }
    }
}

/// CredentialResolver decides how one endpoint gets its credentials.
///
/// The decision is made without any I/O. The source itself is created once
/// and shared by every accessor handed out, so all connections to the
/// endpoint refresh through one provider and one cache.
#[derive(Debug)]
pub struct CredentialResolver {
    endpoint: EndpointConfig,
    ctx: Context,
    accessor: OnceCell<CredentialAccessor>,
}

impl CredentialResolver {
    /// Create a resolver for `endpoint`, running its sources within `ctx`.
    pub fn new(endpoint: EndpointConfig, ctx: Context) -> Self {
        Self {
            endpoint,
            ctx,
            accessor: OnceCell::new(),
        }
    }

    /// Pick the credential source.
    ///
    /// 1. Static keys win when both are non-empty.
    /// 2. Without a role, the default chain is used.
    /// 3. With a role, web identity is used if a token file is set, plain
    ///    `AssumeRole` otherwise.
    pub fn selection(&self) -> Selection {
        let ep = &self.endpoint;
        if !ep.access_key_id.is_empty() && !ep.secret_access_key.is_empty() {
            return Selection::Static;
        }

        let Some(role_arn) = ep.assume_role_arn.clone().filter(|v| !v.is_empty()) else {
            let ecs = ep.ecs_relative_uri.is_some()
                || self
                    .ctx
                    .env_var_non_empty(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI)
                    .is_some();
            return Selection::DefaultChain { ecs };
        };

        let region = ep
            .sts_region
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| ep.region.clone());
        match ep.web_identity_token_file.clone().filter(|v| !v.is_empty()) {
            Some(token_file) => Selection::AssumeRoleWithWebIdentity {
                role_arn,
                token_file,
                region,
            },
            None => Selection::AssumeRole { role_arn, region },
        }
    }

    /// Return the accessor of this endpoint, creating the source on first call.
    pub fn accessor(&self) -> CredentialAccessor {
        self.accessor
            .get_or_init(|| self.build_accessor(self.selection()))
            .clone()
    }

    fn build_accessor(&self, selection: Selection) -> CredentialAccessor {
        let ep = &self.endpoint;
        debug!(
            "endpoint {} resolves credentials via {}",
            ep.url,
            selection.name()
        );

        let ctx = self.ctx.clone();
        let source = selection.name();
        match selection {
            Selection::Static => CredentialAccessor::new(
                ctx,
                source,
                StaticCredentialProvider::new(
                    ep.access_key_id.clone(),
                    ep.secret_access_key.clone(),
                ),
            ),
            Selection::DefaultChain { ecs } => {
                let mut chain = ProvideCredentialChain::new()
                    .push(ProfileCredentialProvider::new())
                    .push(ImdsCredentialProvider::new());
                if ecs {
                    let mut provider = EcsCredentialProvider::new();
                    if let Some(uri) = &ep.ecs_relative_uri {
                        provider = provider.with_relative_uri(uri);
                    }
                    chain = chain.push(provider);
                }

                CredentialAccessor::new(ctx, source, DefaultCredentialProvider::with_chain(chain))
            }
            Selection::AssumeRole { role_arn, region } => {
                let mut provider = AssumeRoleCredentialProvider::new(role_arn, region)
                    .with_role_session_name(&ep.assume_role_session_name);
                if let Some(url) = &ep.sts_endpoint_url {
                    provider = provider.with_endpoint_url(url);
                }

                CredentialAccessor::new(ctx, source, provider)
            }
            Selection::AssumeRoleWithWebIdentity {
                role_arn,
                token_file,
                region,
            } => {
                let mut provider =
                    AssumeRoleWithWebIdentityCredentialProvider::new(role_arn, token_file, region)
                        .with_role_session_name(&ep.assume_role_session_name);
                if let Some(url) = &ep.sts_endpoint_url {
                    provider = provider.with_endpoint_url(url);
                }

                CredentialAccessor::new(ctx, source, provider)
            }
        }
    }
}
