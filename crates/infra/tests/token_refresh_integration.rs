//! Token exchanges against a mock authorization server

mod support;

use serde_json::json;
use spapi_domain::{Credentials, GrantlessScope, SpApiError};
use support::{json_response, token_response, TestEnv, REFRESH_TOKEN, TOKEN_PATH};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn explicit_refresh_posts_the_refresh_grant() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_json(json!({
            "grant_type": "refresh_token",
            "client_id": "amzn1.application-oa2-client.test",
            "client_secret": "test-secret",
            "refresh_token": REFRESH_TOKEN
        })))
        .respond_with(token_response("Atza|explicit"))
        .expect(1)
        .mount(&env.auth)
        .await;

    let client = env.client();
    let token = client.refresh_access_token(None).await.expect("refresh");

    assert_eq!(token.as_str(), "Atza|explicit");
    assert_eq!(client.access_token(None).await, Some(token));
}

#[tokio::test]
async fn scoped_refresh_fills_only_the_scoped_slot() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(json!({
            "grant_type": "client_credentials",
            "scope": "sellingpartnerapi::client_credential:rotation"
        })))
        .respond_with(token_response("Atza|rotation"))
        .expect(1)
        .mount(&env.auth)
        .await;

    let client = env.client();
    let token = client
        .refresh_access_token(Some("sellingpartnerapi::client_credential:rotation"))
        .await
        .expect("scoped refresh");

    assert_eq!(token.as_str(), "Atza|rotation");
    assert_eq!(client.access_token(Some(GrantlessScope::ClientCredentialRotation)).await, Some(token));
    assert_eq!(client.access_token(None).await, None);
    assert_eq!(client.access_token(Some(GrantlessScope::Notifications)).await, None);
}

#[tokio::test]
async fn unknown_scope_is_rejected_without_a_request() {
    let env = TestEnv::start().await;

    let err = env
        .client()
        .refresh_access_token(Some("sellingpartnerapi::everything"))
        .await
        .expect_err("invalid scope");

    assert_eq!(err, SpApiError::InvalidScope("sellingpartnerapi::everything".into()));
    assert_eq!(env.token_requests().await, 0);
}

#[tokio::test]
async fn grantless_only_client_needs_a_scope() {
    let env = TestEnv::start().await;

    let err = env
        .client_with(|config| {
            config.refresh_token = None;
            config.options.only_grantless_operations = true;
        })
        .refresh_access_token(None)
        .await
        .expect_err("scope required");

    assert_eq!(err, SpApiError::NoScopeProvided);
    assert_eq!(env.token_requests().await, 0);
}

#[tokio::test]
async fn rejected_grant_surfaces_the_remote_error() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(json_response(
            400,
            json!({
                "error": "invalid_grant",
                "error_description": "The request has an invalid grant parameter : refresh_token"
            }),
        ))
        .mount(&env.auth)
        .await;

    let client = env.client();
    let err = client.refresh_access_token(None).await.expect_err("rejected");

    assert_eq!(
        err,
        SpApiError::TokenExchange {
            code: "invalid_grant".into(),
            description: "The request has an invalid grant parameter : refresh_token".into(),
        }
    );
    assert_eq!(err.code(), "invalid_grant");
    assert_eq!(client.access_token(None).await, None);
}

#[tokio::test]
async fn unexpected_token_body_is_a_parse_error() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&env.auth)
        .await;

    let err = env.client().refresh_access_token(None).await.expect_err("parse error");

    assert_eq!(err, SpApiError::JsonParse { body: "Service Unavailable".into() });
}

#[tokio::test]
async fn authorization_code_exchange_returns_the_full_response() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(json!({ "grant_type": "authorization_code", "code": "ANdNAVhyhqirUelHGEHA" })))
        .respond_with(token_response("Atza|website"))
        .expect(1)
        .mount(&env.auth)
        .await;

    let client = env.client();
    let response = client.exchange("ANdNAVhyhqirUelHGEHA").await.expect("exchange");

    assert_eq!(response.access_token, "Atza|website");
    assert_eq!(response.refresh_token.as_deref(), Some(REFRESH_TOKEN));
    assert_eq!(response.expires_in, Some(3600));
    assert_eq!(client.access_token(None).await, None);
}

#[tokio::test]
async fn updated_credentials_are_used_for_the_next_exchange() {
    let env = TestEnv::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_partial_json(json!({ "client_id": "rotated-id", "refresh_token": "Atzr|rotated" })))
        .respond_with(token_response("Atza|rotated"))
        .expect(1)
        .mount(&env.auth)
        .await;

    let client = env.client();
    client
        .update_credentials(Credentials::new("rotated-id", "rotated-secret").with_refresh_token("Atzr|rotated"))
        .expect("valid credentials");
    let token = client.refresh_access_token(None).await.expect("refresh");

    assert_eq!(token.as_str(), "Atza|rotated");

    let err = client.update_credentials(Credentials::new("", "secret")).expect_err("invalid");
    assert_eq!(err.code(), "CREDENTIALS_MISSING");
}
