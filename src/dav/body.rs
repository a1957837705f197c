//! Response bodies.

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::{Body, Bytes, Frame, SizeHint};
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::ReadBuf;

use crate::io::ContentStream;

pub type DavBody = UnsyncBoxBody<Bytes, io::Error>;

const CHUNK_SIZE: usize = 64 * 1024;

pub fn full(data: impl Into<Bytes>) -> DavBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty() -> DavBody {
    Empty::new().map_err(|never| match never {}).boxed_unsync()
}

/// Stream a reader in chunks of up to 64 KiB.
pub fn from_reader(reader: ContentStream, length: Option<u64>) -> DavBody {
    ReaderBody {
        reader,
        buf: vec![0; CHUNK_SIZE].into_boxed_slice(),
        remaining: length,
        done: false,
    }
    .boxed_unsync()
}

/// Stream chunks as an iterator produces them.
pub fn from_iter<I>(chunks: I) -> DavBody
where
    I: Iterator<Item = io::Result<Bytes>> + Send + Unpin + 'static,
{
    IterBody { chunks }.boxed_unsync()
}

struct ReaderBody {
    reader: ContentStream,
    buf: Box<[u8]>,
    /// Bytes still expected, when known
    remaining: Option<u64>,
    done: bool,
}

impl Body for ReaderBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut buf = ReadBuf::new(&mut this.buf);
        let result = ready!(this.reader.as_mut().poll_read(cx, &mut buf));
        match result {
            Ok(()) if buf.filled().is_empty() => {
                this.done = true;
                Poll::Ready(None)
            }
            Ok(()) => {
                let chunk = Bytes::copy_from_slice(buf.filled());
                if let Some(remaining) = &mut this.remaining {
                    *remaining = remaining.saturating_sub(chunk.len() as u64);
                }
                Poll::Ready(Some(Ok(Frame::data(chunk))))
            }
            Err(err) => {
                this.done = true;
                Poll::Ready(Some(Err(err)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done || self.remaining == Some(0)
    }

    fn size_hint(&self) -> SizeHint {
        match self.remaining {
            Some(remaining) => SizeHint::with_exact(remaining),
            None => SizeHint::default(),
        }
    }
}

struct IterBody<I> {
    chunks: I,
}

impl<I> Body for IterBody<I>
where
    I: Iterator<Item = io::Result<Bytes>> + Unpin,
{
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, io::Error>>> {
        let next = self.get_mut().chunks.next();
        Poll::Ready(next.map(|chunk| chunk.map(Frame::data)))
    }
}
