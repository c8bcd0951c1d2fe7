use anyhow::Result;
use aws_es_core::hash::hex_sha256;
use aws_es_core::{Context, ProvideCredential, SignRequest};
use aws_es_file_read_tokio::TokioFileRead;
use aws_es_http_send_reqwest::ReqwestHttpSend;
use aws_es_sigv4::{DefaultCredentialProvider, RequestSigner, ES_SERVICE, X_AMZ_CONTENT_SHA_256};
use bytes::Bytes;
use http::{Method, StatusCode};
use log::{debug, warn};
use std::env;

/// Live tests run against a real domain only when `AWS_ES_TEST=on`.
///
/// - `AWS_ES_URL`: domain endpoint, for example `https://search-x.us-east-1.es.amazonaws.com`
/// - `AWS_ES_REGION`: region of the domain
///
/// Credentials come from the default chain.
async fn init_signer() -> Option<(Context, RequestSigner, String)> {
    let _ = dotenv::dotenv();
    let _ = env_logger::builder().is_test(true).try_init();

    if env::var("AWS_ES_TEST").unwrap_or_default() != "on" {
        warn!("AWS_ES_TEST is not set, skip live signing test");
        return None;
    }

    let url = env::var("AWS_ES_URL").expect("env AWS_ES_URL must be set");
    let region = env::var("AWS_ES_REGION").expect("env AWS_ES_REGION must be set");

    let ctx = Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(aws_es_core::OsEnv);

    Some((ctx, RequestSigner::new(ES_SERVICE, &region), url))
}

async fn send_signed(method: Method, path: &str, body: &'static [u8]) -> Result<Option<StatusCode>> {
    let Some((ctx, signer, url)) = init_signer().await else {
        return Ok(None);
    };

    let cred = DefaultCredentialProvider::new()
        .provide_credential(&ctx)
        .await?
        .expect("credential must be available for live tests");

    let req = http::Request::builder()
        .method(method)
        .uri(format!("{}{path}", url.trim_end_matches('/')))
        .header("content-type", "application/json")
        .header(X_AMZ_CONTENT_SHA_256, hex_sha256(body))
        .body(Bytes::from_static(body))?;
    let (mut parts, body) = req.into_parts();
    signer.sign_request(&ctx, &mut parts, Some(&cred)).await?;
    let req = http::Request::from_parts(parts, body);
    debug!("signed request: {req:?}");

    let resp = ctx.http_send(req).await?;
    Ok(Some(resp.status()))
}

#[tokio::test]
async fn test_get_cluster_health() -> Result<()> {
    let Some(status) = send_signed(Method::GET, "/_cluster/health", b"").await? else {
        return Ok(());
    };
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_search_with_query() -> Result<()> {
    let Some(status) = send_signed(
        Method::GET,
        "/_search?q=level:error&size=1",
        b"",
    )
    .await?
    else {
        return Ok(());
    };
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn test_bulk_index() -> Result<()> {
    let Some(status) = send_signed(
        Method::POST,
        "/aws-es-live-test/_bulk?refresh=true",
        b"{\"index\":{}}\n{\"message\":\"signed\"}\n",
    )
    .await?
    else {
        return Ok(());
    };
    assert_eq!(status, StatusCode::OK);
    Ok(())
}
