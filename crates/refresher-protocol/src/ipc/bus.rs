use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::Message;

/// Default number of undelivered messages a slow listener may fall behind.
pub const BUS_CAPACITY: usize = 16;

/// Reasons a message could not be handed to any listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// Nobody is currently listening.
    #[error("no listener attached")]
    NoListener,
}

/// Outbound side of a notification channel.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Deliver `msg` to whatever listeners are attached.
    async fn send(&self, msg: Message) -> Result<(), SendError>;
}

/// In-process fan-out channel standing in for the extension runtime's
/// message passing. Every attached [`Listener`] sees every message.
#[derive(Clone)]
pub struct Bus {
    tx: broadcast::Sender<Message>,
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Attach a new listener. It receives messages sent after this call.
    pub fn subscribe(&self) -> Listener {
        Listener {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of currently attached listeners.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[async_trait]
impl MessageSink for Bus {
    async fn send(&self, msg: Message) -> Result<(), SendError> {
        self.tx
            .send(msg)
            .map(|_| ())
            .map_err(|_| SendError::NoListener)
    }
}

/// Receiving side of a [`Bus`].
pub struct Listener {
    rx: broadcast::Receiver<Message>,
}

impl Listener {
    /// Wait for the next message. Returns `None` once every sender is gone.
    ///
    /// A listener that falls behind skips the messages it missed; only the
    /// most recent settings matter to a receiver.
    pub async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(msg) => return Some(msg),
                Err(RecvError::Lagged(n)) => {
                    warn!(skipped = n, "listener lagged, dropping old messages");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;

    #[tokio::test]
    async fn send_without_listener_reports_no_listener() {
        let bus = Bus::new();
        let err = bus
            .send(Message::settings_changed(Settings::default()))
            .await
            .unwrap_err();
        assert_eq!(err, SendError::NoListener);
    }

    #[tokio::test]
    async fn every_listener_sees_each_message() {
        let bus = Bus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.listeners(), 2);
        let msg = Message::settings_changed(Settings::new(true, 9));
        bus.send(msg.clone()).await.unwrap();
        assert_eq!(a.recv().await, Some(msg.clone()));
        assert_eq!(b.recv().await, Some(msg));
    }

    #[tokio::test]
    async fn lagging_listener_keeps_latest() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();
        for secs in 1..=(BUS_CAPACITY as u32 + 4) {
            bus.send(Message::settings_changed(Settings::new(true, secs)))
                .await
                .unwrap();
        }
        let mut last = None;
        while let Ok(Some(msg)) =
            tokio::time::timeout(std::time::Duration::from_millis(10), rx.recv()).await
        {
            last = msg.settings();
        }
        assert_eq!(last, Some(Settings::new(true, BUS_CAPACITY as u32 + 4)));
    }

    #[tokio::test]
    async fn recv_ends_when_bus_dropped() {
        let bus = Bus::new();
        let mut rx = bus.subscribe();
        drop(bus);
        assert_eq!(rx.recv().await, None);
    }
}
