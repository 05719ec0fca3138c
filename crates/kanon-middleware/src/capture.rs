//! Response capture.
//!
//! [`CaptureBody`] decorates an outbound body: every frame is forwarded to the
//! transport unchanged while the data is copied aside. Once the transport has
//! read the body to the end and dropped it, the copy is handed off as a
//! [`CapturedResponse`]. A body dropped early, e.g. because the client went
//! away, is never handed off.

use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use kanon_contract::CapturedResponse;
use tokio::sync::oneshot;

use crate::types::Response;

/// A body that records what passes through it.
#[derive(Debug)]
pub struct CaptureBody<B> {
    inner: B,
    status: StatusCode,
    headers: HeaderMap,
    buffer: BytesMut,
    finished: bool,
    sender: Option<oneshot::Sender<CapturedResponse>>,
}

impl<B: Body> CaptureBody<B> {
    /// Wraps `inner`, sending the capture to `sender` once it is complete.
    pub fn new(
        inner: B,
        status: StatusCode,
        headers: HeaderMap,
        sender: oneshot::Sender<CapturedResponse>,
    ) -> Self {
        let finished = inner.is_end_stream();
        Self {
            inner,
            status,
            headers,
            buffer: BytesMut::new(),
            finished,
            sender: Some(sender),
        }
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(frame))) => {
                if let Some(data) = frame.data_ref() {
                    this.buffer.extend_from_slice(data);
                }
                if this.inner.is_end_stream() {
                    this.finished = true;
                }
            }
            Poll::Ready(None) => this.finished = true,
            Poll::Ready(Some(Err(_))) | Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

impl<B> Drop for CaptureBody<B> {
    fn drop(&mut self) {
        if !self.finished {
            return;
        }
        if let Some(sender) = self.sender.take() {
            let captured = CapturedResponse::new(
                self.status,
                mem::take(&mut self.headers),
                self.buffer.split().freeze(),
            );
            // The receiver may already be gone; nothing is waiting then.
            let _ = sender.send(captured);
        }
    }
}

/// Wraps the body of `response` in a [`CaptureBody`].
///
/// The receiver resolves after the transport has consumed and dropped the
/// body, and errors if the body was dropped before its end.
pub fn capture(response: Response) -> (Response, oneshot::Receiver<CapturedResponse>) {
    let (sender, receiver) = oneshot::channel();
    let (parts, body) = response.into_parts();
    let body = CaptureBody::new(body, parts.status, parts.headers.clone(), sender).boxed();
    (Response::from_parts(parts, body), receiver)
}
