//! Token endpoint client

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use spapi_domain::{
    Result, SpApiError, Timeouts, TokenErrorResponse, TokenExchangeBody, TokenResponse,
};
use tracing::{debug, instrument};

use crate::http::HttpClient;

/// Exchanges grants for access tokens.
///
/// This trait allows dependency injection and testing with fake endpoints.
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    async fn request_token(
        &self,
        body: &TokenExchangeBody,
        timeouts: &Timeouts,
    ) -> Result<TokenResponse>;
}

/// `TokenEndpoint` posting JSON to the authorization server.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: HttpClient,
    url: String,
}

impl AuthClient {
    pub fn new(http: HttpClient, url: impl Into<String>) -> Self {
        Self { http, url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl TokenEndpoint for AuthClient {
    /// # Errors
    /// - `TokenExchange` with the remote `error`/`error_description`
    /// - `JsonParse` when the response is neither a token nor an error
    #[instrument(skip(self, body, timeouts), fields(grant_type = ?body.grant_type))]
    async fn request_token(
        &self,
        body: &TokenExchangeBody,
        timeouts: &Timeouts,
    ) -> Result<TokenResponse> {
        let request = self
            .http
            .request(Method::POST, &self.url)
            .header("content-type", "application/json")
            .json(body);
        let response = self.http.execute(request, timeouts).await?;
        debug!(status = response.status, "token endpoint responded");

        parse_token_response(&response.body)
    }
}

fn parse_token_response(body: &[u8]) -> Result<TokenResponse> {
    let raw = || SpApiError::JsonParse { body: String::from_utf8_lossy(body).into_owned() };
    let value: Value = serde_json::from_slice(body).map_err(|_| raw())?;

    if value.get("access_token").is_some_and(Value::is_string) {
        return serde_json::from_value(value).map_err(|_| raw());
    }
    if value.get("error").is_some_and(Value::is_string) {
        let error: TokenErrorResponse = serde_json::from_value(value).map_err(|_| raw())?;
        return Err(error.into());
    }
    Err(raw())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_shape_is_accepted() {
        let token =
            parse_token_response(br#"{"access_token":"Atza|abc","token_type":"bearer","expires_in":3600}"#)
                .unwrap();
        assert_eq!(token.access_token, "Atza|abc");
        assert_eq!(token.expires_in, Some(3600));
    }

    #[test]
    fn error_shape_surfaces_remote_code() {
        let err = parse_token_response(
            br#"{"error":"invalid_grant","error_description":"The request has an invalid grant parameter"}"#,
        )
        .unwrap_err();
        assert_eq!(err.code(), "invalid_grant");
        assert!(err.to_string().contains("invalid grant parameter"));
    }

    #[test]
    fn anything_else_is_a_parse_error() {
        let err = parse_token_response(b"<html>bad gateway</html>").unwrap_err();
        assert_eq!(err, SpApiError::JsonParse { body: "<html>bad gateway</html>".into() });

        let err = parse_token_response(br#"{"unexpected":true}"#).unwrap_err();
        assert_eq!(err.code(), "JSON_PARSE_ERROR");
    }
}
