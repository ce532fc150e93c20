//! Report lifecycle types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::document::DownloadOptions;
use crate::constants::DEFAULT_REPORT_POLL_INTERVAL_MS;
use crate::impl_wire_conversions;
use crate::utils::serde::option_duration_millis;

/// `processingStatus` values reported by `getReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportStatus {
    InQueue,
    InProgress,
    Done,
    Cancelled,
    Fatal,
}

impl_wire_conversions!(ReportStatus {
    InQueue => "IN_QUEUE",
    InProgress => "IN_PROGRESS",
    Done => "DONE",
    Cancelled => "CANCELLED",
    Fatal => "FATAL",
});

impl ReportStatus {
    /// Terminal statuses that will never yield a document.
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Cancelled | Self::Fatal)
    }
}

/// Position of a report job in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportState {
    Creating,
    Polling,
    Done,
    Fetching,
    Cancelled,
    Failed,
}

/// Mutable bookkeeping for one report job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportJob {
    pub state: ReportState,
    pub report_id: Option<String>,
    pub report_document_id: Option<String>,
    /// Number of status checks made so far
    pub tries: u32,
    pub interval_ms: u64,
    /// Cancel once this many status checks have not reached DONE
    pub cancel_after: Option<u32>,
}

impl ReportJob {
    pub fn new(interval: Duration, cancel_after: Option<u32>) -> Self {
        Self {
            state: ReportState::Creating,
            report_id: None,
            report_document_id: None,
            tries: 0,
            interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
            cancel_after,
        }
    }

    pub fn record_try(&mut self) {
        self.tries = self.tries.saturating_add(1);
    }

    /// Whether another wait-and-poll cycle is allowed.
    pub fn may_wait(&self) -> bool {
        self.cancel_after.map_or(true, |limit| limit > self.tries)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Input for the create/poll/fetch/download flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// `createReport` request body
    pub body: Value,
    /// Reports API version used for all four operations
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default, with = "option_duration_millis")]
    pub interval: Option<Duration>,
    #[serde(default)]
    pub cancel_after: Option<u32>,
    #[serde(default)]
    pub download: DownloadOptions,
}

impl ReportRequest {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            version: None,
            interval: None,
            cancel_after: None,
            download: DownloadOptions::default(),
        }
    }

    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    #[must_use]
    pub fn cancel_after(mut self, tries: u32) -> Self {
        self.cancel_after = Some(tries);
        self
    }

    #[must_use]
    pub fn download(mut self, download: DownloadOptions) -> Self {
        self.download = download;
        self
    }

    pub fn effective_interval(&self) -> Duration {
        self.interval.unwrap_or(Duration::from_millis(DEFAULT_REPORT_POLL_INTERVAL_MS))
    }
}
