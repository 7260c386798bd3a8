//! Channel-backed host bridge

use super::notification::HostNotification;
use super::NotificationSink;
use tokio::sync::mpsc;

/// Forwards every callback as a [`HostNotification`] message
#[derive(Debug, Clone)]
pub struct ChannelBridge {
    tx: mpsc::UnboundedSender<HostNotification>,
}

impl ChannelBridge {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, notification: HostNotification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("Host notification dropped, receiver is gone");
        }
    }
}

impl NotificationSink for ChannelBridge {
    fn deliver(&self, notification: HostNotification) {
        self.forward(notification);
    }
}
