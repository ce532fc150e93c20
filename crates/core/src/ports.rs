//! Port interfaces
//!
//! These traits define the boundaries between orchestration logic and the
//! infrastructure that performs HTTP calls and waits.

use std::time::Duration;

use async_trait::async_trait;
use spapi_domain::{ApiResponse, CallRequest, Result};

/// Issues a fully orchestrated API call (resolution, auth, retries).
#[async_trait]
pub trait ApiCaller: Send + Sync {
    async fn call(&self, request: CallRequest) -> Result<ApiResponse>;
}

/// Timed waits between retries and poll cycles.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
