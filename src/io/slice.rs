use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use tokio::io::{AsyncRead, AsyncSeek, AsyncSeekExt, ReadBuf};

/// Read-only window onto a byte range of a larger source.
///
/// Position `0` of the slice is `base` in the backing source, and reads stop
/// at `base + length` even when the backing source continues. The slice owns
/// its backing source, so dropping the slice closes it.
#[derive(Debug)]
pub struct SliceReader<R> {
    inner: R,
    base: u64,
    length: u64,
    /// Position within the slice
    pos: u64,
    /// Slice position requested by an in-flight seek
    seek_target: Option<u64>,
}

impl<R: AsyncRead + AsyncSeek + Unpin> SliceReader<R> {
    /// Wrap `inner`, positioned at the start of the slice.
    ///
    /// Fails if the range does not fit inside the backing source or the
    /// backing source cannot seek.
    pub async fn new(mut inner: R, base: u64, length: u64) -> io::Result<Self> {
        let backing_len = inner.seek(SeekFrom::End(0)).await?;
        let end = base
            .checked_add(length)
            .ok_or_else(|| invalid_input("slice end overflows"))?;
        if end > backing_len {
            return Err(invalid_input(format!(
                "slice {base}..{end} lies outside the backing source ({backing_len} bytes)"
            )));
        }
        inner.seek(SeekFrom::Start(base)).await?;

        Ok(Self {
            inner,
            base,
            length,
            pos: 0,
            seek_target: None,
        })
    }
}

impl<R> SliceReader<R> {
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for SliceReader<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let remaining = this.length.saturating_sub(this.pos);
        if remaining == 0 || buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if buf.remaining() as u64 <= remaining {
            let before = buf.filled().len();
            ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;
            this.pos += (buf.filled().len() - before) as u64;
        } else {
            // Caller asked for more than the slice has left: read the tail
            // through a buffer of exactly the right size.
            let mut tail = vec![0u8; remaining as usize];
            let mut tail_buf = ReadBuf::new(&mut tail);
            ready!(Pin::new(&mut this.inner).poll_read(cx, &mut tail_buf))?;
            let filled = tail_buf.filled();
            buf.put_slice(filled);
            this.pos += filled.len() as u64;
        }
        Poll::Ready(Ok(()))
    }
}

impl<R: AsyncSeek + Unpin> AsyncSeek for SliceReader<R> {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        let target = match position {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => this.pos.checked_add_signed(delta),
            SeekFrom::End(delta) => this.length.checked_add_signed(delta),
        };
        let target = match target {
            Some(target) if target <= this.length => target,
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "position must be inside the slice",
                ));
            }
        };

        Pin::new(&mut this.inner).start_seek(SeekFrom::Start(this.base + target))?;
        this.seek_target = Some(target);
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        let this = self.get_mut();
        ready!(Pin::new(&mut this.inner).poll_complete(cx))?;
        if let Some(target) = this.seek_target.take() {
            this.pos = target;
        }
        Poll::Ready(Ok(this.pos))
    }
}

fn invalid_input(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, message.into())
}
