//! Document codecs
//!
//! Pure transformations applied around pre-signed document transfers. The
//! infra layer performs the HTTP exchange and file I/O, then hands bytes here.

pub mod charset;
pub mod compression;
pub mod error_envelope;
pub mod transcode;

use spapi_domain::{
    Compression, DocumentContent, DownloadOptions, Result, SpApiError, UploadContent,
    UploadOptions,
};

pub use compression::StreamingGunzip;
pub use error_envelope::decode_error;

/// Decode a fully buffered download.
///
/// Compressed bodies are returned as [`DocumentContent::Binary`] when
/// unzipping is disabled. Otherwise the body is gunzipped if needed, decoded
/// with the selected charset and optionally transcoded to JSON.
pub fn decode_download(
    body: Vec<u8>,
    compression: Compression,
    content_type: Option<&str>,
    options: &DownloadOptions,
) -> Result<DocumentContent> {
    let bytes = match compression {
        Compression::Gzip if !options.unzip => return Ok(DocumentContent::Binary(body)),
        Compression::Gzip => compression::gunzip(&body)?,
        Compression::None => body,
    };
    let charset = charset::select(options.charset.as_deref(), content_type);
    let text = charset::decode(&bytes, &charset)?;
    if options.json {
        transcode::to_json(text, content_type)
    } else {
        Ok(DocumentContent::Text(text))
    }
}

/// Check that an upload names its content type and has something to send.
///
/// # Errors
/// - `NoFeedContentProvided` when neither inline content nor a file is given
/// - `NoFeedContentTypeProvided` when the content type is missing
pub fn validate_upload(options: &UploadOptions) -> Result<&str> {
    if options.content.is_none() && options.file.is_none() {
        return Err(SpApiError::NoFeedContentProvided);
    }
    options
        .content_type
        .as_deref()
        .map(str::trim)
        .filter(|content_type| !content_type.is_empty())
        .ok_or(SpApiError::NoFeedContentTypeProvided)
}

/// Bytes to upload for inline content, encoded per the content type charset.
pub fn encode_inline(content: &UploadContent, content_type: &str) -> Result<Vec<u8>> {
    match content {
        UploadContent::Bytes(bytes) => Ok(bytes.clone()),
        UploadContent::Text(text) => {
            let charset = charset::select(None, Some(content_type));
            charset::encode(text, &charset)
        }
    }
}

/// Check file content against the charset declared in the content type.
pub fn check_file_content(bytes: &[u8], content_type: &str) -> Result<()> {
    match charset::from_content_type(content_type) {
        Some(charset) => charset::validate(bytes, &charset),
        None => Ok(()),
    }
}
