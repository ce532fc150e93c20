//! Shared helpers for infra integration tests
#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};
use spapi_core::testing::RecordingSleeper;
use spapi_domain::{AppCredentials, ClientConfig};
use spapi_infra::SellingPartner;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN_PATH: &str = "/auth/o2/token";
pub const REFRESH_TOKEN: &str = "Atzr|integration-refresh";

/// Mock API host and authorization server plus a recording sleeper.
pub struct TestEnv {
    pub api: MockServer,
    pub auth: MockServer,
    pub sleeper: Arc<RecordingSleeper>,
}

impl TestEnv {
    pub async fn start() -> Self {
        Self {
            api: MockServer::start().await,
            auth: MockServer::start().await,
            sleeper: Arc::new(RecordingSleeper::new()),
        }
    }

    /// Configuration pointing both hosts at the mock servers.
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(
            "eu",
            AppCredentials {
                app_client_id: "amzn1.application-oa2-client.test".into(),
                app_client_secret: "test-secret".into(),
            },
        )
        .refresh_token(REFRESH_TOKEN);
        config.options.api_base_url = Some(self.api.uri());
        config.options.auth_url = Some(format!("{}{}", self.auth.uri(), TOKEN_PATH));
        config
    }

    pub fn client(&self) -> SellingPartner {
        self.client_with(|_| {})
    }

    pub fn client_with(&self, adjust: impl FnOnce(&mut ClientConfig)) -> SellingPartner {
        let mut config = self.config();
        adjust(&mut config);
        SellingPartner::builder()
            .config(config)
            .sleeper(self.sleeper.clone())
            .build()
            .expect("client should build")
    }

    /// Answer every refresh-token grant with `token`.
    pub async fn mount_refresh_token(&self, token: &str) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .and(body_partial_json(json!({ "grant_type": "refresh_token" })))
            .respond_with(token_response(token))
            .mount(&self.auth)
            .await;
    }

    /// Number of requests the authorization server received.
    pub async fn token_requests(&self) -> usize {
        self.auth.received_requests().await.map_or(0, |requests| requests.len())
    }
}

pub fn token_response(token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": token,
        "refresh_token": REFRESH_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600
    }))
}

pub fn json_response(status: u16, body: Value) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(body)
}

/// `{"errors": [...]}` body with a single entry.
pub fn error_response(status: u16, code: &str, message: &str) -> ResponseTemplate {
    json_response(status, json!({ "errors": [{ "code": code, "message": message, "details": "" }] }))
}
