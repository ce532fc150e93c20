//! Pre-signed document transfers
//!
//! Report and feed documents live behind pre-signed URLs: no access token is
//! attached, and failures come back as storage error envelopes rather than the
//! API's JSON `errors` list.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Method;
use spapi_core::document::{
    check_file_content, decode_download, decode_error, encode_inline, validate_upload,
};
use spapi_domain::{
    Compression, DocumentContent, DocumentDetails, DownloadOptions, Result, SpApiError, Timeouts,
    UploadOptions,
};
use tracing::{debug, instrument};

use super::stream::gunzip_stream;
use crate::errors::InfraError;
use crate::http::HttpClient;

/// Live document body, inflated on the fly when requested.
pub struct DocumentStream {
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl DocumentStream {
    /// Read the rest of the stream into memory.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.body.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }
}

impl fmt::Debug for DocumentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentStream")
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct DocumentTransfer {
    http: HttpClient,
    timeouts: Timeouts,
}

impl DocumentTransfer {
    /// `timeouts` are the defaults for transfers that set none of their own.
    pub fn new(http: HttpClient, timeouts: Timeouts) -> Self {
        Self { http, timeouts }
    }

    /// Download and decode a document.
    ///
    /// When `options.file` is set the content is also written there, as JSON
    /// text for transcoded documents.
    ///
    /// # Errors
    /// - `InvalidDocumentDetails` / `UnknownZipStandard` for bad details
    /// - `Remote` for a non-200 response, decoded from the error body
    /// - decode and transcode errors from the document codecs
    /// - `Io` when the file cannot be written
    #[instrument(skip_all)]
    pub async fn download(
        &self,
        details: &DocumentDetails,
        options: &DownloadOptions,
    ) -> Result<DocumentContent> {
        let (url, compression) = details.validate()?;
        let timeouts = options.timeouts.or(&self.timeouts);

        let response = self.http.execute(self.http.request(Method::GET, url), &timeouts).await?;
        let content_type = response.content_type().map(str::to_owned);
        if response.status != 200 {
            return Err(decode_error(response.status, &response.body, content_type.as_deref()));
        }
        debug!(bytes = response.body.len(), gzip = compression == Compression::Gzip, "document downloaded");

        let content = decode_download(response.body, compression, content_type.as_deref(), options)?;
        if let Some(path) = &options.file {
            save(path, &content).await?;
        }
        Ok(content)
    }

    /// Open a document as a byte stream.
    ///
    /// A failed response is drained once so it can be decoded like a
    /// buffered download's error.
    #[instrument(skip_all)]
    pub async fn download_stream(
        &self,
        details: &DocumentDetails,
        options: &DownloadOptions,
    ) -> Result<DocumentStream> {
        let (url, compression) = details.validate()?;
        let timeouts = options.timeouts.or(&self.timeouts);

        let response = self.http.stream(self.http.request(Method::GET, url), &timeouts).await?;
        let content_type = response.header("content-type").map(str::to_owned);
        if response.status != 200 {
            let status = response.status;
            let body = response.collect().await?;
            return Err(decode_error(status, &body, content_type.as_deref()));
        }

        let body = match compression {
            Compression::Gzip if options.unzip => gunzip_stream(response.body),
            _ => response.body,
        };
        Ok(DocumentStream { content_type, body })
    }

    /// Upload inline content or a file to a pre-signed URL.
    ///
    /// # Errors
    /// - `NoFeedContentProvided` / `NoFeedContentTypeProvided`
    /// - `InvalidDocumentDetails` when the URL is missing
    /// - `Decode` when file content does not match the declared charset
    /// - `Remote` for a non-200 response
    #[instrument(skip_all)]
    pub async fn upload(&self, details: &DocumentDetails, options: &UploadOptions) -> Result<()> {
        let content_type = validate_upload(options)?.to_string();
        let (url, _) = details.validate()?;

        let bytes = match (&options.content, &options.file) {
            (Some(content), _) => encode_inline(content, &content_type)?,
            (None, Some(path)) => {
                let bytes = tokio::fs::read(path).await.map_err(InfraError::from)?;
                check_file_content(&bytes, &content_type)?;
                bytes
            }
            (None, None) => return Err(SpApiError::NoFeedContentProvided),
        };
        debug!(bytes = bytes.len(), content_type = %content_type, "uploading document");

        let timeouts = options.timeouts.or(&self.timeouts);
        let request = self
            .http
            .request(Method::PUT, url)
            .header("content-type", content_type.as_str())
            .body(bytes);
        let response = self.http.execute(request, &timeouts).await?;
        if response.status != 200 {
            return Err(decode_error(response.status, &response.body, response.content_type()));
        }
        Ok(())
    }
}

async fn save(path: &Path, content: &DocumentContent) -> Result<()> {
    let bytes: Cow<'_, [u8]> = match content {
        DocumentContent::Text(text) => Cow::Borrowed(text.as_bytes()),
        DocumentContent::Json(value) => Cow::Owned(
            serde_json::to_vec(value).map_err(|e| SpApiError::Parse(e.to_string()))?,
        ),
        DocumentContent::Binary(bytes) => Cow::Borrowed(bytes.as_slice()),
    };
    tokio::fs::write(path, bytes).await.map_err(InfraError::from)?;
    debug!(path = %path.display(), "document saved");
    Ok(())
}
