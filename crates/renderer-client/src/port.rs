//! Outbound side of the message channel.

use renderer_protocol::ClientMessage;
use tokio::sync::mpsc;

use crate::client::ClientError;

/// Posts client messages to the resolver host.
pub trait MessagePort: Send + Sync {
    fn post(&self, message: ClientMessage) -> Result<(), ClientError>;
}

/// Port backed by an unbounded channel; the receiving end is drained by
/// whatever transport carries messages to the host.
#[derive(Debug, Clone)]
pub struct ChannelPort {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl ChannelPort {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessagePort for ChannelPort {
    fn post(&self, message: ClientMessage) -> Result<(), ClientError> {
        self.tx.send(message).map_err(|_| ClientError::ChannelClosed)
    }
}
