// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::{create_test_context, ASSUME_ROLE_RESPONSE};
use aws_es_core::{ErrorKind, ProvideCredential};
use aws_es_sigv4::{AssumeRoleCredentialProvider, StaticCredentialProvider};
use mockito::{Matcher, Server};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

const ROLE_ARN: &str = "arn:aws:iam::123456789012:role/search-writer";

#[tokio::test]
async fn test_assume_role_signed_with_base_credentials() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("Action".into(), "AssumeRole".into()),
            Matcher::UrlEncoded("RoleArn".into(), ROLE_ARN.into()),
            Matcher::UrlEncoded("RoleSessionName".into(), "fluentd".into()),
            Matcher::UrlEncoded("Version".into(), "2011-06-15".into()),
        ]))
        .match_header(
            "authorization",
            Matcher::Regex(
                r"^AWS4-HMAC-SHA256 Credential=AKIDBASEKEY/\d{8}/eu-west-1/sts/aws4_request, "
                    .into(),
            ),
        )
        .match_header("x-amz-security-token", "base-session-token")
        .with_status(200)
        .with_body(ASSUME_ROLE_RESPONSE)
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let provider = AssumeRoleCredentialProvider::new(ROLE_ARN, "eu-west-1")
        .with_role_session_name("fluentd")
        .with_endpoint_url(server.url())
        .with_base_provider(
            StaticCredentialProvider::new("AKIDBASEKEY", "base-secret-key")
                .with_session_token("base-session-token"),
        );

    let cred = provider
        .provide_credential(&ctx)
        .await
        .expect("assume role must succeed")
        .expect("credential must exist");

    mock.assert_async().await;
    assert_eq!(cred.access_key_id, "ASIAROLEACCESSKEY");
    assert_eq!(cred.secret_access_key, "role-secret-access-key");
    assert_eq!(cred.session_token.as_deref(), Some("role-session-token"));
    assert!(cred.expires_in.is_some());
}

#[tokio::test]
async fn test_assume_role_access_denied() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_header("x-amzn-requestid", "4f3b1c2a-0000-0000-0000-000000000000")
        .with_body(
            r#"<ErrorResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
  <Error>
    <Type>Sender</Type>
    <Code>AccessDenied</Code>
    <Message>User is not authorized to perform: sts:AssumeRole</Message>
  </Error>
</ErrorResponse>"#,
        )
        .create_async()
        .await;

    let ctx = create_test_context(HashMap::new());
    let err = AssumeRoleCredentialProvider::new(ROLE_ARN, "us-east-1")
        .with_endpoint_url(server.url())
        .with_base_provider(StaticCredentialProvider::new("AKIDBASEKEY", "base-secret-key"))
        .provide_credential(&ctx)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CredentialDenied);
    assert!(err
        .context()
        .iter()
        .any(|c| c == "request_id: 4f3b1c2a-0000-0000-0000-000000000000"));
}
