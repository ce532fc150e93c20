//! Report and feed document types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::request::Timeouts;
use crate::constants::SUPPORTED_COMPRESSION;
use crate::errors::{Result, SpApiError};

/// Location and compression of a stored document, as returned by
/// `getReportDocument` / `getFeedDocument`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetails {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub compression_algorithm: Option<String>,
}

impl DocumentDetails {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: Some(url.into()), compression_algorithm: None }
    }

    #[must_use]
    pub fn gzip(mut self) -> Self {
        self.compression_algorithm = Some(SUPPORTED_COMPRESSION.to_string());
        self
    }

    /// Check the URL is present and the compression is supported.
    ///
    /// # Errors
    /// - `InvalidDocumentDetails` if `url` is missing or blank
    /// - `UnknownZipStandard` for any compression other than GZIP
    pub fn validate(&self) -> Result<(&str, Compression)> {
        let url = self
            .url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| SpApiError::InvalidDocumentDetails("document url is missing".into()))?;
        let compression = match self.compression_algorithm.as_deref() {
            None => Compression::None,
            Some(algorithm) if algorithm == SUPPORTED_COMPRESSION => Compression::Gzip,
            Some(other) => return Err(SpApiError::UnknownZipStandard(other.to_string())),
        };
        Ok((url, compression))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

/// Download behaviour for documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    /// Transcode the text into JSON based on the content type
    #[serde(default)]
    pub json: bool,
    /// Gunzip compressed documents
    #[serde(default = "default_unzip")]
    pub unzip: bool,
    /// Also save the result to this path
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Overrides the charset from the response content type
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub timeouts: Timeouts,
}

fn default_unzip() -> bool {
    true
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self { json: false, unzip: true, file: None, charset: None, timeouts: Timeouts::default() }
    }
}

impl DownloadOptions {
    #[must_use]
    pub fn json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    #[must_use]
    pub fn unzip(mut self, unzip: bool) -> Self {
        self.unzip = unzip;
        self
    }

    #[must_use]
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Downloaded document contents.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentContent {
    Text(String),
    Json(Value),
    /// Compressed bytes, returned when unzipping was disabled
    Binary(Vec<u8>),
}

impl DocumentContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Inline feed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadContent {
    Text(String),
    Bytes(Vec<u8>),
}

/// Upload input: inline content or a file, plus the declared content type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub content: Option<UploadContent>,
    pub file: Option<PathBuf>,
    pub content_type: Option<String>,
    pub timeouts: Timeouts,
}

impl UploadOptions {
    pub fn text(content: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            content: Some(UploadContent::Text(content.into())),
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    pub fn bytes(content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            content: Some(UploadContent::Bytes(content)),
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    pub fn file(path: impl Into<PathBuf>, content_type: impl Into<String>) -> Self {
        Self {
            file: Some(path.into()),
            content_type: Some(content_type.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}
