//! Streaming adapters for document bodies

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use spapi_core::document::StreamingGunzip;
use spapi_domain::Result;

struct GunzipState {
    body: BoxStream<'static, Result<Bytes>>,
    decoder: Option<StreamingGunzip>,
}

/// Inflate a gzip body chunk by chunk.
pub fn gunzip_stream(body: BoxStream<'static, Result<Bytes>>) -> BoxStream<'static, Result<Bytes>> {
    stream::try_unfold(GunzipState { body, decoder: Some(StreamingGunzip::new()) }, next_inflated)
        .boxed()
}

async fn next_inflated(mut state: GunzipState) -> Result<Option<(Bytes, GunzipState)>> {
    loop {
        let next = match state.decoder {
            Some(_) => state.body.next().await,
            None => return Ok(None),
        };
        let inflated = match (next, state.decoder.take()) {
            (Some(chunk), Some(mut decoder)) => {
                let inflated = decoder.push(&chunk?)?;
                state.decoder = Some(decoder);
                inflated
            }
            (None, Some(decoder)) => decoder.finish()?,
            (_, None) => return Ok(None),
        };
        if !inflated.is_empty() {
            return Ok(Some((Bytes::from(inflated), state)));
        }
    }
}
