use std::future::Future;
use std::io;
use std::mem;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::{pin_project, pinned_drop};
use tokio::io::ReadBuf;
use tokio::time::Sleep;

use crate::config::Pacing;
use crate::error::StreamError;
use crate::resource::{AsyncSeekStart, RangeBody};

/// Paced, chunked delivery of one byte window of a [`RangeBody`].
///
/// Created per request by [`DeliverySession::start`] and consumed as the
/// response body. Implements [`Stream`], [`Body`], and [`IntoResponse`].
///
/// Chunks are `chunk_size` bytes except possibly the last one. With
/// [`Pacing::Paced`] a timer runs after every chunk, the last one included,
/// so the body only ends one interval after its final chunk.
#[pin_project(PinnedDrop)]
pub struct DeliverySession<B> {
    state: SessionState,
    chunk_size: NonZeroUsize,
    pacing: Pacing,
    length: u64,
    delivered: u64,
    /// Read during [`DeliverySession::start`], not yet handed to the sink.
    first: Option<Bytes>,
    #[pin]
    body: B,
}

#[derive(Debug)]
enum SessionState {
    /// Filling `buffer` up to `target` bytes. `remaining` counts bytes of the
    /// window not yet read from the source.
    Streaming { buffer: BytesMut, target: usize, remaining: u64 },
    Pacing { sleep: Pin<Box<Sleep>>, remaining: u64 },
    Done,
    Errored,
}

impl<B: RangeBody + Unpin> DeliverySession<B> {
    /// Seeks `body` to `start`, reads the first chunk and prepares to deliver
    /// `length` bytes.
    ///
    /// Runs before any response headers exist, so a failed seek or first read
    /// can still be answered with a `500`.
    pub async fn start(
        mut body: B,
        start: u64,
        length: u64,
        chunk_size: NonZeroUsize,
        pacing: Pacing,
    ) -> Result<Self, StreamError> {
        debug_assert!(start.saturating_add(length) <= body.byte_size());

        let mut source = Pin::new(&mut body);
        AsyncSeekStart::start_seek(source.as_mut(), start).map_err(StreamError::StreamReadFailure)?;
        std::future::poll_fn(|cx| AsyncSeekStart::poll_complete(source.as_mut(), cx))
            .await
            .map_err(StreamError::StreamReadFailure)?;

        let mut session = DeliverySession {
            state: next_chunk(length, chunk_size),
            chunk_size,
            pacing,
            length,
            delivered: 0,
            first: None,
            body,
        };
        let first = std::future::poll_fn(|cx| Pin::new(&mut session).poll_chunk(cx))
            .await
            .transpose()
            .map_err(StreamError::StreamReadFailure)?;
        session.first = first;

        tracing::debug!(start, length, chunk_size = chunk_size.get(), ?pacing, "delivery session started");
        Ok(session)
    }
}

impl<B> DeliverySession<B> {
    /// Bytes handed to the sink so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// True once the window has been fully delivered or a read failed.
    pub fn is_finished(&self) -> bool {
        self.first.is_none() && matches!(self.state, SessionState::Done | SessionState::Errored)
    }
}

fn next_chunk(remaining: u64, chunk_size: NonZeroUsize) -> SessionState {
    if remaining == 0 {
        return SessionState::Done;
    }
    let target = usize::try_from(remaining).map_or(chunk_size.get(), |r| r.min(chunk_size.get()));
    SessionState::Streaming { buffer: BytesMut::with_capacity(target), target, remaining }
}

impl<B: RangeBody + Send + 'static> IntoResponse for DeliverySession<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: RangeBody> Body for DeliverySession<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length - self.delivered)
    }

    fn is_end_stream(&self) -> bool {
        self.is_finished()
    }

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>)
        -> Poll<Option<io::Result<Frame<Bytes>>>>
    {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeBody> Stream for DeliverySession<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>
    ) -> Poll<Option<io::Result<Bytes>>> {
        let chunk = match self.as_mut().project().first.take() {
            Some(chunk) => chunk,
            None => match ready!(self.as_mut().poll_chunk(cx)) {
                Some(Ok(chunk)) => chunk,
                other => return Poll::Ready(other),
            },
        };

        let this = self.project();
        *this.delivered += chunk.len() as u64;
        tracing::trace!(len = chunk.len(), delivered = *this.delivered, "chunk delivered");
        Poll::Ready(Some(Ok(chunk)))
    }
}

impl<B: RangeBody> DeliverySession<B> {
    /// Reads the next chunk from the source and arms the pacing timer behind it.
    fn poll_chunk(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        let mut this = self.project();

        loop {
            match this.state {
                SessionState::Pacing { sleep, remaining } => {
                    ready!(sleep.as_mut().poll(cx));
                    let remaining = *remaining;
                    *this.state = next_chunk(remaining, *this.chunk_size);
                }

                SessionState::Streaming { buffer, target, remaining } => {
                    while buffer.len() < *target {
                        let wanted = *target - buffer.len();
                        let mut read_buf = ReadBuf::uninit(&mut buffer.spare_capacity_mut()[..wanted]);

                        match this.body.as_mut().poll_read(cx, &mut read_buf) {
                            Poll::Pending => return Poll::Pending,
                            Poll::Ready(Err(e)) => {
                                tracing::warn!(delivered = *this.delivered, "media read failed: {e}");
                                *this.state = SessionState::Errored;
                                return Poll::Ready(Some(Err(e)));
                            }
                            Poll::Ready(Ok(())) => match read_buf.filled().len() {
                                0 => {
                                    let e = io::Error::new(
                                        io::ErrorKind::UnexpectedEof,
                                        "media resource ended before the requested range",
                                    );
                                    tracing::warn!(delivered = *this.delivered, remaining = *remaining, "{e}");
                                    *this.state = SessionState::Errored;
                                    return Poll::Ready(Some(Err(e)));
                                }
                                n => {
                                    // SAFETY: poll_read has initialised `n`
                                    // bytes of the spare capacity
                                    unsafe { buffer.set_len(buffer.len() + n); }

                                    // n <= wanted <= remaining, so this never underflows
                                    *remaining -= n as u64;
                                }
                            },
                        }
                    }

                    let chunk = mem::take(buffer).freeze();
                    let remaining = *remaining;

                    *this.state = match *this.pacing {
                        Pacing::Paced(interval) => SessionState::Pacing {
                            sleep: Box::pin(tokio::time::sleep(interval)),
                            remaining,
                        },
                        Pacing::Unpaced => next_chunk(remaining, *this.chunk_size),
                    };
                    return Poll::Ready(Some(Ok(chunk)));
                }

                SessionState::Done | SessionState::Errored => return Poll::Ready(None),
            }
        }
    }
}

#[pinned_drop]
impl<B> PinnedDrop for DeliverySession<B> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        match this.state {
            SessionState::Done if this.first.is_none() => {
                tracing::debug!(delivered = *this.delivered, "delivery session finished");
            }
            SessionState::Errored => {}
            _ => {
                tracing::debug!(
                    delivered = *this.delivered,
                    length = *this.length,
                    "client went away, delivery session aborted"
                );
            }
        }
    }
}
