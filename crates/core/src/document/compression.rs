//! GZIP decompression, whole-buffer and incremental

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzDecoder as GzWriteDecoder;
use spapi_domain::{Result, SpApiError};

fn gunzip_error(err: &std::io::Error) -> SpApiError {
    SpApiError::Io(format!("gunzip failed: {err}"))
}

/// Decompress a complete GZIP buffer.
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).map_err(|e| gunzip_error(&e))?;
    Ok(out)
}

/// Incremental GZIP decoder for streamed downloads.
///
/// Feed compressed chunks with [`push`](Self::push); each call returns the
/// bytes decompressed so far. [`finish`](Self::finish) flushes the tail and
/// verifies the trailer.
pub struct StreamingGunzip {
    decoder: GzWriteDecoder<Vec<u8>>,
}

impl StreamingGunzip {
    pub fn new() -> Self {
        Self { decoder: GzWriteDecoder::new(Vec::new()) }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        self.decoder.write_all(chunk).map_err(|e| gunzip_error(&e))?;
        Ok(std::mem::take(self.decoder.get_mut()))
    }

    pub fn finish(mut self) -> Result<Vec<u8>> {
        self.decoder.try_finish().map_err(|e| gunzip_error(&e))?;
        Ok(std::mem::take(self.decoder.get_mut()))
    }
}

impl Default for StreamingGunzip {
    fn default() -> Self {
        Self::new()
    }
}
