use super::create_test_context;
use aws_es_core::{ErrorKind, ProvideCredential};
use aws_es_sigv4::ImdsCredentialProvider;
use mockito::Server;
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::time::Duration;

const ROLE_CREDENTIALS: &str = r#"{
  "Code" : "Success",
  "LastUpdated" : "2024-01-01T00:00:00Z",
  "Type" : "AWS-HMAC",
  "AccessKeyId" : "ASIAIMDSACCESSKEY",
  "SecretAccessKey" : "imds-secret-access-key",
  "Token" : "imds-session-token",
  "Expiration" : "2099-01-01T00:00:00Z"
}"#;

#[tokio::test]
async fn test_imds_token_flow() {
    let mut server = Server::new_async().await;
    let token = server
        .mock("PUT", "/latest/api/token")
        .match_header("x-aws-ec2-metadata-token-ttl-seconds", "21600")
        .with_status(200)
        .with_body("imds-token")
        .expect(1)
        .create_async()
        .await;
    let list = server
        .mock("GET", "/latest/meta-data/iam/security-credentials/")
        .match_header("x-aws-ec2-metadata-token", "imds-token")
        .with_status(200)
        .with_body("search-writer")
        .expect(2)
        .create_async()
        .await;
    let fetch = server
        .mock("GET", "/latest/meta-data/iam/security-credentials/search-writer")
        .match_header("x-aws-ec2-metadata-token", "imds-token")
        .with_status(200)
        .with_body(ROLE_CREDENTIALS)
        .expect(2)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let provider = ImdsCredentialProvider::new().with_endpoint(server.url());

    let cred = provider
        .provide_credential(&ctx)
        .await
        .expect("imds must succeed")
        .expect("credential must exist");
    assert_eq!(cred.access_key_id, "ASIAIMDSACCESSKEY");
    assert_eq!(cred.secret_access_key, "imds-secret-access-key");
    assert_eq!(cred.session_token.as_deref(), Some("imds-session-token"));
    assert!(cred.expires_in.is_some());

    // The session token is cached between calls.
    provider
        .provide_credential(&ctx)
        .await
        .expect("imds must succeed");

    token.assert_async().await;
    list.assert_async().await;
    fetch.assert_async().await;
}

#[tokio::test]
async fn test_imds_endpoint_from_env() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/latest/api/token")
        .with_status(200)
        .with_body("imds-token")
        .create_async()
        .await;
    server
        .mock("GET", "/latest/meta-data/iam/security-credentials/")
        .with_status(404)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::from([(
        "AWS_EC2_METADATA_SERVICE_ENDPOINT".to_string(),
        server.url(),
    )]));

    // No role attached means the source does not apply.
    let cred = ImdsCredentialProvider::new()
        .provide_credential(&ctx)
        .await
        .expect("imds must succeed");
    assert!(cred.is_none());
}

#[tokio::test]
async fn test_imds_unauthorized_role() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/latest/api/token")
        .with_status(200)
        .with_body("imds-token")
        .create_async()
        .await;
    server
        .mock("GET", "/latest/meta-data/iam/security-credentials/")
        .with_status(200)
        .with_body("search-writer")
        .create_async()
        .await;
    server
        .mock("GET", "/latest/meta-data/iam/security-credentials/search-writer")
        .with_status(200)
        .with_body(r#"{"Code":"AssumeRoleUnauthorizedAccess","Message":"not trusted"}"#)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let err = ImdsCredentialProvider::new()
        .with_endpoint(server.url())
        .provide_credential(&ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialDenied);
}

#[tokio::test]
async fn test_imds_server_error_is_retryable() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/latest/api/token")
        .with_status(503)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let err = ImdsCredentialProvider::new()
        .with_endpoint(server.url())
        .with_timeout(Duration::from_millis(500))
        .provide_credential(&ctx)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    assert!(err.is_retryable());
}
