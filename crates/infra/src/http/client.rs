use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::header::HeaderMap;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use spapi_domain::{RawResponse, Result, SpApiError, Timeouts};
use tokio::time::Instant;
use tracing::debug;

use crate::errors::InfraError;

/// HTTP client with built-in retry and per-call time budgets.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: ReqwestClient,
    max_attempts: usize,
    base_backoff: Duration,
}

/// Fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn into_raw(self) -> RawResponse {
        RawResponse { status: self.status, headers: self.headers, body: self.body }
    }
}

/// Response whose body is read lazily, chunk by chunk.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl StreamingResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Drain the remaining body into memory.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut body = Vec::new();
        while let Some(chunk) = self.body.next().await {
            body.extend_from_slice(&chunk?);
        }
        Ok(body)
    }
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Absolute end of a call, with the budget it was derived from.
#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    fn start(budget: Option<Duration>) -> Option<Self> {
        budget.map(|budget| Self { at: Instant::now() + budget, budget })
    }
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Send the request and buffer the whole body.
    ///
    /// `timeouts.response` bounds each attempt until headers arrive,
    /// `timeouts.idle` bounds every gap between body chunks and
    /// `timeouts.deadline` bounds the exchange as a whole.
    pub async fn execute(&self, builder: RequestBuilder, timeouts: &Timeouts) -> Result<HttpResponse> {
        let deadline = Deadline::start(timeouts.deadline);
        let mut response = self.send(builder, timeouts.response, deadline).await?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let mut body = Vec::new();
        while let Some(chunk) = next_chunk(&mut response, timeouts.idle, deadline).await? {
            body.extend_from_slice(&chunk);
        }

        Ok(HttpResponse { status, headers, body })
    }

    /// Send the request and hand back the body as a stream.
    ///
    /// The idle and deadline budgets keep applying while the stream is
    /// consumed.
    pub async fn stream(
        &self,
        builder: RequestBuilder,
        timeouts: &Timeouts,
    ) -> Result<StreamingResponse> {
        let deadline = Deadline::start(timeouts.deadline);
        let response = self.send(builder, timeouts.response, deadline).await?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let idle = timeouts.idle;
        let body = stream::try_unfold(response, move |mut response| async move {
            let chunk = next_chunk(&mut response, idle, deadline).await?;
            Ok::<_, SpApiError>(chunk.map(|chunk| (chunk, response)))
        })
        .boxed();

        Ok(StreamingResponse { status, headers, body })
    }

    /// Execute the provided request builder with retry semantics.
    async fn send(
        &self,
        builder: RequestBuilder,
        response_timeout: Option<Duration>,
        deadline: Option<Deadline>,
    ) -> Result<Response> {
        let attempts = self.max_attempts.max(1);

        for attempt in 0..attempts {
            let cloned_builder = builder.try_clone().ok_or_else(|| {
                SpApiError::Config(
                    "request body cannot be cloned; buffer the body to enable retries".into(),
                )
            })?;

            let request = cloned_builder.build().map_err(InfraError::from)?;

            let method = request.method().clone();
            let url = request.url().clone();
            debug!(attempt = attempt + 1, %method, %url, "sending HTTP request");

            match bounded(self.client.execute(request), "response", response_timeout, deadline)
                .await?
            {
                Ok(response) => {
                    let status = response.status();
                    debug!(attempt = attempt + 1, %method, %url, %status, "received HTTP response");

                    if status.is_server_error() && attempt + 1 < attempts {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(err) => {
                    debug!(attempt = attempt + 1, %method, %url, error = %err, "HTTP request failed");

                    if attempt + 1 < attempts && should_retry_error(&err) {
                        self.sleep_with_backoff(attempt + 1).await;
                        continue;
                    }

                    return Err(InfraError::from(err).into());
                }
            }
        }

        Err(SpApiError::Transport {
            message: "http client exhausted retries without producing a result".into(),
            timeout: None,
        })
    }

    fn backoff_delay(&self, retry_number: usize) -> Duration {
        let shift = retry_number.saturating_sub(1).min(8) as u32;
        let multiplier = 1u32 << shift;
        self.base_backoff.saturating_mul(multiplier)
    }

    async fn sleep_with_backoff(&self, retry_number: usize) {
        let delay = self.backoff_delay(retry_number);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

/// Run `future` under the tighter of the phase budget and the deadline.
async fn bounded<F: Future>(
    future: F,
    phase: &str,
    limit: Option<Duration>,
    deadline: Option<Deadline>,
) -> Result<F::Output> {
    let mut end = limit.map(|budget| (Instant::now() + budget, phase, budget));
    if let Some(deadline) = deadline {
        if end.map_or(true, |(at, _, _)| deadline.at < at) {
            end = Some((deadline.at, "deadline", deadline.budget));
        }
    }

    match end {
        None => Ok(future.await),
        Some((at, phase, budget)) => tokio::time::timeout_at(at, future)
            .await
            .map_err(|_| InfraError::timeout(phase, budget).into()),
    }
}

async fn next_chunk(
    response: &mut Response,
    idle: Option<Duration>,
    deadline: Option<Deadline>,
) -> Result<Option<Bytes>> {
    bounded(response.chunk(), "idle", idle, deadline)
        .await?
        .map_err(|err| InfraError::from(err).into())
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (name.as_str().to_ascii_lowercase(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        })
        .collect()
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Option<Duration>,
    max_attempts: usize,
    base_backoff: Duration,
    user_agent: Option<String>,
    default_headers: Option<HeaderMap>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self {
            timeout: None,
            max_attempts: 1,
            base_backoff: Duration::from_millis(200),
            user_agent: None,
            default_headers: None,
        }
    }
}

impl HttpClientBuilder {
    /// Hard cap applied by reqwest to every request, on top of per-call budgets.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Configure the total number of attempts (initial try + retries).
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = Some(headers);
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().no_proxy();

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if let Some(headers) = self.default_headers {
            builder = builder.default_headers(headers);
        }

        let client = builder.build().map_err(InfraError::from)?;

        Ok(HttpClient {
            client,
            max_attempts: self.max_attempts.max(1),
            base_backoff: self.base_backoff,
        })
    }
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    if err.is_timeout() || err.is_request() {
        return true;
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        if err.is_connect() {
            return true;
        }
    }
    false
}
