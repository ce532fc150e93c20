//! Test doubles for the core ports
//!
//! Available to this crate's tests and, through the `test-utils` feature, to
//! downstream test suites.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use spapi_domain::{ApiResponse, CallRequest, Result, SpApiError};

use crate::ports::{ApiCaller, Sleeper};

/// Sleeper that records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sleeps.lock().len()
    }

    pub fn total(&self) -> Duration {
        self.sleeps.lock().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
    }
}

/// `ApiCaller` answering from per-operation scripts, in order.
///
/// Requests are keyed by operation name (the part after the dot in
/// `endpoint.operation`) or by `api_path` for raw calls.
#[derive(Debug, Default)]
pub struct ScriptedCaller {
    scripts: Mutex<HashMap<String, VecDeque<Result<ApiResponse>>>>,
    calls: Mutex<Vec<CallRequest>>,
}

impl ScriptedCaller {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(self, operation: &str, response: Result<ApiResponse>) -> Self {
        self.scripts.lock().entry(operation.to_string()).or_default().push_back(response);
        self
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().clone()
    }

    fn key(request: &CallRequest) -> String {
        match (&request.operation, &request.api_path) {
            (Some(operation), _) => {
                operation.rsplit_once('.').map_or(operation.as_str(), |(_, op)| op).to_string()
            }
            (None, Some(path)) => path.clone(),
            (None, None) => String::new(),
        }
    }
}

#[async_trait]
impl ApiCaller for ScriptedCaller {
    async fn call(&self, request: CallRequest) -> Result<ApiResponse> {
        let key = Self::key(&request);
        self.calls.lock().push(request);
        self.scripts
            .lock()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(SpApiError::Config(format!("no scripted response for '{key}'"))))
    }
}
