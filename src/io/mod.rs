mod slice;

pub use slice::SliceReader;

use std::pin::Pin;
use tokio::io::AsyncRead;

/// Body of a file as handed between providers and the HTTP layer
pub type ContentStream = Pin<Box<dyn AsyncRead + Send>>;
