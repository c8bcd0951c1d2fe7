use crate::provide_credential::{
    EcsCredentialProvider, ImdsCredentialProvider, ProfileCredentialProvider,
    ProvideCredentialChain,
};
use crate::Credential;
use async_trait::async_trait;
use aws_es_core::{Context, ProvideCredential, Result};

/// DefaultCredentialProvider walks the ambient credential sources.
///
/// Resolution order:
///
/// 1. Shared profile files (`~/.aws/credentials`, `~/.aws/config`)
/// 2. EC2 instance metadata (IMDSv2)
/// 3. Container credentials (ECS relative URI)
///
/// This order is a convention of this crate, not a security boundary.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a new `DefaultCredentialProvider` instance.
    pub fn new() -> Self {
        Self::with_ecs(EcsCredentialProvider::new())
    }

    /// Create the default chain with a configured container provider.
    pub fn with_ecs(ecs: EcsCredentialProvider) -> Self {
        let chain = ProvideCredentialChain::new()
            .push(ProfileCredentialProvider::new())
            .push(ImdsCredentialProvider::new())
            .push(ecs);

        Self { chain }
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain) -> Self {
        Self { chain }
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }
}
