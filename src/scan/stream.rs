//! Cancellable stream of decoded payloads.

use super::controller::PayloadResult;
use super::ScanController;
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Decoded payloads of one scan session.
///
/// Yields non-empty payloads until the session is stopped, or a single
/// [`ScanError`](crate::ScanError) if the camera could not be acquired.
/// Dropping the stream stops the session.
pub struct PayloadStream {
    receiver: mpsc::Receiver<PayloadResult>,
    controller: ScanController,
}

impl PayloadStream {
    pub(crate) fn new(receiver: mpsc::Receiver<PayloadResult>, controller: ScanController) -> Self {
        Self {
            receiver,
            controller,
        }
    }

    /// Waits for the next payload; `None` once the session has ended.
    pub async fn next_payload(&mut self) -> Option<PayloadResult> {
        self.receiver.recv().await
    }

    /// Returns an already delivered payload without waiting.
    pub fn try_next_payload(&mut self) -> Option<PayloadResult> {
        self.receiver.try_recv().ok()
    }

    /// Stops the session. Payloads already delivered can still be read.
    pub fn cancel(&self) {
        self.controller.stop();
    }

    /// The controller driving this stream.
    pub fn controller(&self) -> &ScanController {
        &self.controller
    }
}

impl Stream for PayloadStream {
    type Item = PayloadResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for PayloadStream {
    fn drop(&mut self) {
        self.controller.stop();
    }
}

impl std::fmt::Debug for PayloadStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadStream")
            .field("state", &self.controller.state())
            .finish()
    }
}
