//! Domain types and models
//!
//! Grouped by the concern they describe: outgoing requests, API responses,
//! tokens and credentials, report jobs and document transfers.

pub mod document;
pub mod report;
pub mod request;
pub mod response;
pub mod token;

pub use document::{
    Compression, DocumentContent, DocumentDetails, DownloadOptions, UploadContent, UploadOptions,
};
pub use report::{ReportJob, ReportRequest, ReportState, ReportStatus};
pub use request::{
    CallOptions, CallRequest, HttpMethod, OperationParams, QueryMap, RequestDescriptor,
    ResolvedOperation, Timeouts,
};
pub use response::{ApiResponse, RawResponse};
pub use token::{
    AccessToken, Credentials, GrantType, GrantlessScope, TokenErrorResponse, TokenExchangeBody,
    TokenResponse,
};
