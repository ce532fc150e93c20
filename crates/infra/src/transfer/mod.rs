//! Document upload and download

mod document;
mod stream;

pub use document::{DocumentStream, DocumentTransfer};
pub use stream::gunzip_stream;
