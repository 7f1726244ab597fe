//! Notification delivery back to the originating channel.

use async_trait::async_trait;
use tracing::info;

use crate::event::ChannelRef;

/// Delivers a message to the originating conversation.
///
/// Implementations typically perform network I/O. The pipeline awaits
/// delivery but treats the gating decision as final regardless of outcome;
/// delivery failures are the implementation's to log.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Send `message` to `channel`.
    ///
    /// `urgent` asks the transport to surface the message prominently
    /// (an alert rather than a quiet notice).
    async fn notify(&self, channel: ChannelRef, message: &str, urgent: bool);
}

/// Sink that writes notifications to the log.
///
/// Used by the driver binary and as a stand-in wherever no real transport
/// is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn notify(&self, channel: ChannelRef, message: &str, urgent: bool) {
        info!(channel = %channel, urgent, message, "Notification");
    }
}
