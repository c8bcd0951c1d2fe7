use crate::{create_test_context, SIGNATURE_PATTERN};
use aws_es_core::ErrorKind;
use aws_es_transport::{AwsElasticsearchService, Config, EndpointConfig};
use bytes::Bytes;
use http::{Method, StatusCode};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use std::io::Write;

const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/search-writer";

fn sts_response(action: &str, access_key_id: &str, session_token: &str) -> String {
    format!(
        r#"<{action}Response xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <{action}Result>
    <Credentials>
      <AccessKeyId>{access_key_id}</AccessKeyId>
      <SecretAccessKey>role-secret-access-key</SecretAccessKey>
      <SessionToken>{session_token}</SessionToken>
      <Expiration>2099-01-01T00:00:00Z</Expiration>
    </Credentials>
  </{action}Result>
  <ResponseMetadata>
    <RequestId>c6104cbe-af31-11e0-8154-cbc7ccf896c7</RequestId>
  </ResponseMetadata>
</{action}Response>"#
    )
}

#[tokio::test]
async fn test_assume_role_refreshes_once_for_concurrent_requests() -> anyhow::Result<()> {
    let mut profile = tempfile::NamedTempFile::new()?;
    writeln!(profile, "[default]")?;
    writeln!(profile, "aws_access_key_id = AKIDPROFILEKEY")?;
    writeln!(profile, "aws_secret_access_key = profile-secret-access-key")?;

    let mut server = Server::new_async().await;
    let sts = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Action".into(), "AssumeRole".into()),
            Matcher::UrlEncoded("RoleArn".into(), ROLE_ARN.into()),
            Matcher::UrlEncoded("RoleSessionName".into(), "fluentd".into()),
        ]))
        .match_header(
            "authorization",
            Matcher::Regex(format!(
                r"^AWS4-HMAC-SHA256 Credential=AKIDPROFILEKEY/\d{{8}}/us-east-1/sts/aws4_request{SIGNATURE_PATTERN}"
            )),
        )
        .with_status(200)
        .with_body(sts_response(
            "AssumeRole",
            "ASIAROLEACCESSKEY",
            "role-session-token",
        ))
        .expect(1)
        .create_async()
        .await;
    let search = server
        .mock("GET", "/_cluster/health")
        .match_header(
            "authorization",
            Matcher::Regex(format!(
                r"^AWS4-HMAC-SHA256 Credential=ASIAROLEACCESSKEY/\d{{8}}/eu-west-1/es/aws4_request{SIGNATURE_PATTERN}"
            )),
        )
        .match_header("x-amz-security-token", "role-session-token")
        .with_status(200)
        .expect(8)
        .create_async()
        .await;

    let config = Config::new(vec![EndpointConfig::new("eu-west-1", server.url())
        .with_assume_role(ROLE_ARN)
        .with_sts_region("us-east-1")
        .with_sts_endpoint_url(server.url())]);
    let ctx = create_test_context(&[(
        "AWS_SHARED_CREDENTIALS_FILE",
        profile.path().to_string_lossy().to_string(),
    )]);
    let service = AwsElasticsearchService::configure_with_context(config, ctx)?;
    let pool = service.connect()?;

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let pool = pool.clone();
            tokio::spawn(async move {
                let conn = pool.select().expect("pool must not be empty");
                let req = conn
                    .request(Method::GET, "/_cluster/health")
                    .body(Bytes::new())?;
                conn.send(req).await
            })
        })
        .collect();
    for task in tasks {
        let resp = task.await??;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    sts.assert_async().await;
    search.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_web_identity_token_exchange() -> anyhow::Result<()> {
    let mut token = tempfile::NamedTempFile::new()?;
    write!(token, "eyJhbGciOiJSUzI1NiJ9.fluentd.token")?;

    let mut server = Server::new_async().await;
    let sts = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Action".into(), "AssumeRoleWithWebIdentity".into()),
            Matcher::UrlEncoded("RoleArn".into(), ROLE_ARN.into()),
            Matcher::UrlEncoded(
                "WebIdentityToken".into(),
                "eyJhbGciOiJSUzI1NiJ9.fluentd.token".into(),
            ),
        ]))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(sts_response(
            "AssumeRoleWithWebIdentity",
            "ASIAWEBIDENTITYKEY",
            "web-identity-session-token",
        ))
        .expect(1)
        .create_async()
        .await;
    let search = server
        .mock("POST", "/logs/_doc")
        .match_header(
            "authorization",
            Matcher::Regex(r"Credential=ASIAWEBIDENTITYKEY/\d{8}/us-west-2/es/aws4_request".into()),
        )
        .match_header("x-amz-security-token", "web-identity-session-token")
        .with_status(201)
        .expect(2)
        .create_async()
        .await;

    let config = Config::new(vec![EndpointConfig::new("us-west-2", server.url())
        .with_assume_role(ROLE_ARN)
        .with_web_identity_token_file(token.path().to_string_lossy())
        .with_sts_endpoint_url(server.url())]);
    let service = AwsElasticsearchService::configure_with_context(config, create_test_context(&[]))?;
    let pool = service.connect()?;
    let conn = pool.select().expect("pool must not be empty");

    for _ in 0..2 {
        let req = conn
            .request(Method::POST, "/logs/_doc")
            .header("content-type", "application/json")
            .body(Bytes::from_static(b"{\"message\":\"hello\"}"))?;
        let resp = conn.send(req).await?;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    sts.assert_async().await;
    search.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_no_credentials_fails_before_sending() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let search = server
        .mock("GET", "/_cluster/health")
        .expect(0)
        .create_async()
        .await;

    let config = Config::new(vec![EndpointConfig::new("us-east-1", server.url())]);
    let service = AwsElasticsearchService::configure_with_context(config, create_test_context(&[]))?;
    let pool = service.connect()?;
    let conn = pool.select().expect("pool must not be empty");

    let req = conn
        .request(Method::GET, "/_cluster/health")
        .body(Bytes::new())?;
    let err = conn.send(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialNotFound);

    search.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_missing_credentials_are_reported_once_per_endpoint() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let token = server
        .mock("PUT", "/latest/api/token")
        .with_status(200)
        .with_body("imds-token")
        .expect(1)
        .create_async()
        .await;
    // No role attached, so the whole chain comes up empty.
    let roles = server
        .mock("GET", "/latest/meta-data/iam/security-credentials/")
        .with_status(404)
        .expect(1)
        .create_async()
        .await;
    let search = server
        .mock("GET", "/_cluster/health")
        .expect(0)
        .create_async()
        .await;

    let ctx = create_test_context(&[
        ("AWS_EC2_METADATA_DISABLED", "false".to_string()),
        ("AWS_EC2_METADATA_SERVICE_ENDPOINT", server.url()),
    ]);
    let config = Config::new(vec![EndpointConfig::new("us-east-1", server.url())]);
    let service = AwsElasticsearchService::configure_with_context(config, ctx)?;
    let pool = service.connect()?;

    for _ in 0..3 {
        let conn = pool.select().expect("pool must not be empty");
        let req = conn
            .request(Method::GET, "/_cluster/health")
            .body(Bytes::new())?;
        let err = conn.send(req).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CredentialNotFound);
    }

    token.assert_async().await;
    roles.assert_async().await;
    search.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_denied_role_fails_the_request() -> anyhow::Result<()> {
    let mut profile = tempfile::NamedTempFile::new()?;
    writeln!(profile, "[default]")?;
    writeln!(profile, "aws_access_key_id = AKIDPROFILEKEY")?;
    writeln!(profile, "aws_secret_access_key = profile-secret-access-key")?;

    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(
            r#"<ErrorResponse><Error><Code>AccessDenied</Code><Message>not allowed</Message></Error></ErrorResponse>"#,
        )
        .create_async()
        .await;
    let search = server
        .mock("GET", "/_cluster/health")
        .expect(0)
        .create_async()
        .await;

    let config = Config::new(vec![EndpointConfig::new("us-east-1", server.url())
        .with_assume_role(ROLE_ARN)
        .with_sts_endpoint_url(server.url())]);
    let ctx = create_test_context(&[(
        "AWS_SHARED_CREDENTIALS_FILE",
        profile.path().to_string_lossy().to_string(),
    )]);
    let service = AwsElasticsearchService::configure_with_context(config, ctx)?;
    let pool = service.connect()?;
    let conn = pool.select().expect("pool must not be empty");

    let req = conn
        .request(Method::GET, "/_cluster/health")
        .body(Bytes::new())?;
    let err = conn.send(req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialDenied);

    search.assert_async().await;
    Ok(())
}
