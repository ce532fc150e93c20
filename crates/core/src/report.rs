//! Report lifecycle state machine
//!
//! create → poll until DONE → fetch document details. The download itself is
//! left to the caller so the same flow serves buffered and streamed reports.

use std::sync::Arc;

use serde_json::Value;
use spapi_domain::constants::REPORTS_ENDPOINT;
use spapi_domain::{
    ApiResponse, CallRequest, DocumentDetails, ReportJob, ReportRequest, ReportState,
    ReportStatus, Result, SpApiError,
};
use tracing::{debug, info, instrument, warn};

use crate::ports::{ApiCaller, Sleeper};

/// Drives a report from creation to its document details.
pub struct ReportPoller {
    caller: Arc<dyn ApiCaller>,
    sleeper: Arc<dyn Sleeper>,
}

impl ReportPoller {
    pub fn new(caller: Arc<dyn ApiCaller>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { caller, sleeper }
    }

    /// Run the lifecycle and return the document location.
    ///
    /// # Errors
    /// - any error from `createReport` (not retried)
    /// - `ReportProcessing` when the report ends CANCELLED or FATAL
    /// - `ReportProcessingCancelledManually` once `cancel_after` tries are
    ///   used up; the report is cancelled server-side first
    #[instrument(skip(self, request), fields(version = request.version.as_deref()))]
    pub async fn fetch_document(&self, request: &ReportRequest) -> Result<DocumentDetails> {
        let mut job = ReportJob::new(request.effective_interval(), request.cancel_after);

        let created = self
            .call(request, CallRequest::operation("createReport").body(request.body.clone()))
            .await?;
        let report_id = string_field(&created, "reportId")?;
        info!(report_id = %report_id, "Report created");
        job.report_id = Some(report_id.clone());
        job.state = ReportState::Polling;

        loop {
            let report = self
                .call(
                    request,
                    CallRequest::operation("getReport").path_param("reportId", report_id.as_str()),
                )
                .await?;
            job.record_try();

            let status = report.get("processingStatus").and_then(Value::as_str).unwrap_or_default();
            debug!(report_id = %report_id, status, tries = job.tries, "Report status");

            match status.parse::<ReportStatus>() {
                Ok(ReportStatus::Done) => {
                    job.state = ReportState::Done;
                    job.report_document_id = Some(string_field(&report, "reportDocumentId")?);
                    break;
                }
                Ok(failed) if failed.is_failure() => {
                    job.state = ReportState::Failed;
                    return Err(SpApiError::ReportProcessing { status: failed.to_string() });
                }
                _ if job.may_wait() => self.sleeper.sleep(job.interval()).await,
                _ => {
                    warn!(report_id = %report_id, tries = job.tries, "Cancelling report");
                    self.call(
                        request,
                        CallRequest::operation("cancelReport")
                            .path_param("reportId", report_id.as_str()),
                    )
                    .await?;
                    job.state = ReportState::Cancelled;
                    return Err(SpApiError::ReportProcessingCancelledManually {
                        tries: job.tries,
                        interval_ms: job.interval_ms,
                    });
                }
            }
        }

        job.state = ReportState::Fetching;
        let document_id = job.report_document_id.unwrap_or_default();
        let document = self
            .call(
                request,
                CallRequest::operation("getReportDocument")
                    .path_param("reportDocumentId", document_id.as_str()),
            )
            .await?;
        serde_json::from_value(document)
            .map_err(|e| SpApiError::InvalidDocumentDetails(format!("unexpected document details: {e}")))
    }

    async fn call(&self, request: &ReportRequest, call: CallRequest) -> Result<Value> {
        let mut call = call.endpoint(REPORTS_ENDPOINT);
        if let Some(version) = &request.version {
            call = call.version(version.clone());
        }
        match self.caller.call(call).await? {
            ApiResponse::Payload(value) => Ok(value),
            ApiResponse::NoContent => Ok(Value::Null),
            ApiResponse::Raw(raw) => Err(SpApiError::Parse(format!(
                "unexpected raw response with status {}",
                raw.status
            ))),
        }
    }
}

fn string_field(value: &Value, field: &str) -> Result<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| SpApiError::Parse(format!("report response is missing '{field}'")))
}
