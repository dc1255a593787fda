//! Write-once response handle gated on client cancellation.

use axum::response::Response;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

/// Result of handing a response to a [`GatedResponder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The client is gone; the response was dropped.
    Suppressed,
}

/// The only way a background fetch can answer its HTTP request.
///
/// `deliver` consumes the handle, so a request is answered at most once, and
/// once the request's token is cancelled every delivery is a silent no-op.
pub struct GatedResponder {
    cancel: CancellationToken,
    sink: oneshot::Sender<Response>,
}

impl GatedResponder {
    pub fn channel(cancel: CancellationToken) -> (Self, oneshot::Receiver<Response>) {
        let (sink, receiver) = oneshot::channel();
        (Self { cancel, sink }, receiver)
    }

    pub fn deliver(self, response: Response) -> Delivery {
        if self.cancel.is_cancelled() {
            return Delivery::Suppressed;
        }
        match self.sink.send(response) {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Suppressed,
        }
    }
}
