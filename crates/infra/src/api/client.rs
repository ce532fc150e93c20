//! Selling partner client facade
//!
//! Wires configuration, token handling, request orchestration, report polling
//! and document transfers into one handle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use spapi_core::{ApiCaller, EndpointRegistry, ReportPoller, Sleeper, TokioSleeper, VersionResolver};
use spapi_domain::constants::AUTH_ENDPOINT;
use spapi_domain::{
    AccessToken, ApiResponse, CallRequest, ClientConfig, ClientOptions, Credentials,
    DocumentContent, DocumentDetails, DownloadOptions, GrantlessScope, Region, ReportRequest,
    Result, SpApiError, TokenResponse, UploadOptions,
};
use tracing::{info, instrument};
use url::Url;

use super::orchestrator::RequestOrchestrator;
use crate::auth::{AuthClient, CredentialStore, TokenManager};
use crate::http::HttpClient;
use crate::transfer::{DocumentStream, DocumentTransfer};

/// Client for versioned, OAuth2-protected, rate-limited seller APIs.
pub struct SellingPartner {
    orchestrator: Arc<RequestOrchestrator>,
    tokens: Arc<TokenManager>,
    credentials: Arc<CredentialStore>,
    transfer: DocumentTransfer,
    poller: ReportPoller,
    options: ClientOptions,
    region: Region,
}

impl SellingPartner {
    /// Create a builder for fluent configuration
    pub fn builder() -> SellingPartnerBuilder {
        SellingPartnerBuilder::default()
    }

    /// Build a client from configuration with the built-in registry.
    ///
    /// # Errors
    ///
    /// Any configuration error, see [`SellingPartnerBuilder::build`].
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn resolver(&self) -> &VersionResolver {
        self.orchestrator.resolver()
    }

    /// Call an operation or a raw path
    ///
    /// # Arguments
    ///
    /// * `request` - Operation (or raw path) with its parameters and options
    ///
    /// # Returns
    ///
    /// The unwrapped payload, a no-content marker, or the raw response when
    /// `raw_result` is set
    ///
    /// # Errors
    ///
    /// Resolution, authorization, remote and transport errors; see
    /// [`SpApiError`]
    pub async fn call_api(&self, request: CallRequest) -> Result<ApiResponse> {
        self.orchestrator.call(request).await
    }

    /// Call an operation and deserialize its payload.
    pub async fn call_as<T: DeserializeOwned>(&self, request: CallRequest) -> Result<T> {
        self.call_api(request).await?.deserialize()
    }

    /// Download a document described by `details`.
    pub async fn download(
        &self,
        details: &DocumentDetails,
        options: &DownloadOptions,
    ) -> Result<DocumentContent> {
        self.transfer.download(details, options).await
    }

    pub async fn download_stream(
        &self,
        details: &DocumentDetails,
        options: &DownloadOptions,
    ) -> Result<DocumentStream> {
        self.transfer.download_stream(details, options).await
    }

    /// Upload feed content to a pre-signed document URL.
    pub async fn upload(&self, details: &DocumentDetails, options: &UploadOptions) -> Result<()> {
        self.transfer.upload(details, options).await
    }

    /// Create a report, wait for it and download its document
    ///
    /// # Arguments
    ///
    /// * `request` - createReport body, poll interval, cancel threshold and
    ///   download options
    ///
    /// # Errors
    ///
    /// - `ReportProcessing` when the report ends CANCELLED or FATAL
    /// - `ReportProcessingCancelledManually` when `cancel_after` is reached
    /// - any call or transfer error along the way
    #[instrument(skip_all)]
    pub async fn download_report(&self, request: &ReportRequest) -> Result<DocumentContent> {
        let details = self.poller.fetch_document(request).await?;
        self.transfer.download(&details, &request.download).await
    }

    /// Like [`download_report`](Self::download_report), returning a stream.
    #[instrument(skip_all)]
    pub async fn download_report_stream(&self, request: &ReportRequest) -> Result<DocumentStream> {
        let details = self.poller.fetch_document(request).await?;
        self.transfer.download_stream(&details, &request.download).await
    }

    /// Request a new access token for `scope`, or the default token.
    ///
    /// # Errors
    ///
    /// - `InvalidScope` for an unknown scope literal
    /// - `NoScopeProvided` for a default refresh in grantless-only mode
    /// - `TokenExchange` when the authorization server rejects the grant
    pub async fn refresh_access_token(&self, scope: Option<&str>) -> Result<AccessToken> {
        self.tokens.refresh(scope, &self.options.timeouts).await
    }

    /// Exchange an authorization code (website authorization workflow).
    pub async fn exchange(&self, code: &str) -> Result<TokenResponse> {
        self.tokens.exchange(code, &self.options.timeouts).await
    }

    pub async fn access_token(&self, scope: Option<GrantlessScope>) -> Option<AccessToken> {
        self.tokens.token(scope).await
    }

    /// Replace app credentials and refresh token for subsequent exchanges.
    ///
    /// Cached access tokens stay valid until the API reports them expired.
    pub fn update_credentials(&self, credentials: Credentials) -> Result<()> {
        self.credentials.replace(credentials)
    }
}

/// Builder for [`SellingPartner`]
#[derive(Default)]
pub struct SellingPartnerBuilder {
    config: Option<ClientConfig>,
    registry: Option<EndpointRegistry>,
    sleeper: Option<Arc<dyn Sleeper>>,
}

impl SellingPartnerBuilder {
    /// Set client configuration
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the built-in endpoint registry
    pub fn registry(mut self, registry: EndpointRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the sleeper used for throttle and poll waits
    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    /// Build the client
    ///
    /// # Errors
    ///
    /// - `Config` if configuration is missing or a URL override is invalid
    /// - `InvalidRegion`, `MissingCredentials`, `NoRefreshTokenPresent`
    /// - `InvalidVersionPin` for pins naming unknown endpoints or versions
    pub fn build(self) -> Result<SellingPartner> {
        let config = self
            .config
            .ok_or_else(|| SpApiError::Config("Client configuration is required".to_string()))?;
        let region = config.validate()?;
        let options = config.options.clone();

        let registry = Arc::new(self.registry.unwrap_or_else(EndpointRegistry::builtin));
        let resolver =
            VersionResolver::new(registry, config.endpoints_versions.clone(), options.version_fallback)?;

        let http = HttpClient::builder()
            .user_agent(options.user_agent.clone())
            .max_attempts(options.transport_attempts as usize)
            .build()?;

        let credentials = Arc::new(CredentialStore::new(config.app_credentials())?);
        let auth_url = options.auth_url.clone().unwrap_or_else(|| AUTH_ENDPOINT.to_string());
        parse_url(&auth_url)?;
        let auth = AuthClient::new(http.clone(), auth_url);

        let mut tokens = TokenManager::new(Arc::new(auth), credentials.clone(), &options);
        if let Some(token) = config.access_token.as_deref().filter(|token| !token.trim().is_empty()) {
            tokens = tokens.with_token(AccessToken::new(token));
        }
        let tokens = Arc::new(tokens);

        let base_url = config.api_base_url(region);
        let base_url = parse_url(&format!("{}/", base_url.trim_end_matches('/')))?;
        let sleeper = self.sleeper.unwrap_or_else(|| Arc::new(TokioSleeper));

        let orchestrator = Arc::new(RequestOrchestrator::new(
            http.clone(),
            tokens.clone(),
            resolver,
            sleeper.clone(),
            base_url.clone(),
            options.clone(),
        ));
        let poller = ReportPoller::new(orchestrator.clone(), sleeper);
        let transfer = DocumentTransfer::new(http, options.timeouts);

        info!(
            region = %region,
            base_url = %base_url,
            sandbox = options.use_sandbox,
            grantless_only = options.only_grantless_operations,
            "Selling partner client ready"
        );

        Ok(SellingPartner { orchestrator, tokens, credentials, transfer, poller, options, region })
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| SpApiError::Config(format!("Invalid URL '{url}': {e}")))
}
