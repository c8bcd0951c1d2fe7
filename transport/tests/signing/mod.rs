use crate::{create_test_context, SIGNATURE_PATTERN};
use aws_es_core::hash::{hex_sha256, EMPTY_STRING_SHA256};
use aws_es_transport::{AwsElasticsearchService, Config, EndpointConfig};
use bytes::Bytes;
use http::{Method, StatusCode};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;

fn static_config(url: String) -> Config {
    Config::new(vec![EndpointConfig::new("us-east-1", url).with_static_credentials(
        "AKIDEXAMPLE",
        "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
    )])
}

#[tokio::test]
async fn test_static_credentials_sign_every_request() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/_cluster/health")
        .match_header(
            "authorization",
            Matcher::Regex(format!(
                r"^AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/\d{{8}}/us-east-1/es/aws4_request{SIGNATURE_PATTERN}"
            )),
        )
        .match_header("x-amz-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".into()))
        .match_header("x-amz-content-sha256", EMPTY_STRING_SHA256)
        .match_header("x-amz-security-token", Matcher::Missing)
        .with_status(200)
        .with_body(r#"{"status":"green"}"#)
        .expect(3)
        .create_async()
        .await;

    let service = AwsElasticsearchService::configure_with_context(
        static_config(server.url()),
        create_test_context(&[]),
    )?;
    let pool = service.connect()?;

    for _ in 0..3 {
        let conn = pool.select().expect("pool must not be empty");
        let req = conn
            .request(Method::GET, "/_cluster/health")
            .body(Bytes::new())?;
        let resp = conn.send(req).await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), br#"{"status":"green"}"#);
    }

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn test_body_hash_covers_dispatched_bytes() -> anyhow::Result<()> {
    let body = "{\"index\":{\"_index\":\"logs\"}}\n{\"message\":\"hello\"}\n";

    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/_bulk")
        .match_query(Matcher::UrlEncoded("refresh".into(), "true".into()))
        .match_header("x-amz-content-sha256", hex_sha256(body.as_bytes()).as_str())
        .match_header("content-type", "application/x-ndjson")
        .match_body(Matcher::Exact(body.to_string()))
        .with_status(200)
        .with_body(r#"{"errors":false}"#)
        .create_async()
        .await;

    let service = AwsElasticsearchService::configure_with_context(
        static_config(server.url()),
        create_test_context(&[]),
    )?;
    let pool = service.connect()?;
    let conn = pool.select().expect("pool must not be empty");

    let req = conn
        .request(Method::POST, "/_bulk?refresh=true")
        .header("content-type", "application/x-ndjson")
        .body(Bytes::from(body))?;
    let resp = conn.send(req).await?;

    mock.assert_async().await;
    assert_eq!(resp.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_one_descriptor_per_managed_endpoint() -> anyhow::Result<()> {
    let config = Config::from_toml_str(
        r#"
[[endpoints]]
region = "us-east-1"
url = "https://search-x.us-east-1.es.amazonaws.com"
access_key_id = "AKIDEXAMPLE"
secret_access_key = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY"
"#,
    )?;

    let service = AwsElasticsearchService::configure_with_context(config, create_test_context(&[]))?;
    let hosts = service.hosts();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].host, "search-x.us-east-1.es.amazonaws.com");
    assert_eq!(hosts[0].scheme, "https");
    assert_eq!(hosts[0].port, 443);
    assert_eq!(hosts[0].path, None);

    let pool = service.connect()?;
    assert_eq!(
        pool.connections()[0].full_url(),
        "https://search-x.us-east-1.es.amazonaws.com:443"
    );
    Ok(())
}
