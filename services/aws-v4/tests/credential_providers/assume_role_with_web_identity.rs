use super::{create_test_context, ASSUME_ROLE_WITH_WEB_IDENTITY_RESPONSE};
use aws_es_core::ProvideCredential;
use aws_es_sigv4::AssumeRoleWithWebIdentityCredentialProvider;
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::io::Write;

#[tokio::test]
async fn test_web_identity_reads_token_file() -> anyhow::Result<()> {
    let mut token_file = tempfile::NamedTempFile::new()?;
    writeln!(token_file, "eyJhbGciOiJSUzI1NiJ9.web-identity.token")?;

    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Action".into(), "AssumeRoleWithWebIdentity".into()),
            Matcher::UrlEncoded(
                "WebIdentityToken".into(),
                "eyJhbGciOiJSUzI1NiJ9.web-identity.token".into(),
            ),
            Matcher::UrlEncoded("RoleSessionName".into(), "fluentd".into()),
        ]))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body(ASSUME_ROLE_WITH_WEB_IDENTITY_RESPONSE)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let provider = AssumeRoleWithWebIdentityCredentialProvider::new(
        "arn:aws:iam::123456789012:role/search-writer",
        token_file.path().to_string_lossy(),
        "us-west-2",
    )
    .with_role_session_name("fluentd")
    .with_endpoint_url(server.url());

    let cred = provider
        .provide_credential(&ctx)
        .await?
        .expect("credential must exist");

    mock.assert_async().await;
    assert_eq!(cred.access_key_id, "ASIAWEBIDENTITYKEY");
    assert_eq!(cred.session_token.as_deref(), Some("web-identity-session-token"));

    Ok(())
}
