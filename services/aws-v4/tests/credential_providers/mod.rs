mod assume_role;
mod assume_role_with_web_identity;
mod imds;

use aws_es_core::{Context, StaticEnv};
use aws_es_file_read_tokio::TokioFileRead;
use aws_es_http_send_reqwest::ReqwestHttpSend;
use std::collections::HashMap;

/// Context with real file and http capabilities and a fixed environment.
pub fn create_test_context(envs: HashMap<String, String>) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(StaticEnv {
            home_dir: None,
            envs,
        })
}

pub const ASSUME_ROLE_RESPONSE: &str = r#"<AssumeRoleResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleResult>
    <AssumedRoleUser>
      <Arn>arn:aws:sts::123456789012:assumed-role/search-writer/fluentd</Arn>
      <AssumedRoleId>AROA123EXAMPLE:fluentd</AssumedRoleId>
    </AssumedRoleUser>
    <Credentials>
      <AccessKeyId>ASIAROLEACCESSKEY</AccessKeyId>
      <SecretAccessKey>role-secret-access-key</SecretAccessKey>
      <SessionToken>role-session-token</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleResult>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</AssumeRoleResponse>"#;

pub const ASSUME_ROLE_WITH_WEB_IDENTITY_RESPONSE: &str = r#"<AssumeRoleWithWebIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <AssumeRoleWithWebIdentityResult>
    <Credentials>
      <AccessKeyId>ASIAWEBIDENTITYKEY</AccessKeyId>
      <SecretAccessKey>web-identity-secret-key</SecretAccessKey>
      <SessionToken>web-identity-session-token</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
  </AssumeRoleWithWebIdentityResult>
</AssumeRoleWithWebIdentityResponse>"#;
