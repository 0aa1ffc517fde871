//! Boundary to the external reminder dispatcher.
//!
//! The core never delivers messages. It hands each [`Notification`] to a
//! [`Notifier`] after the transaction that produced it has committed.

use farmhand_types::Notification;
use tokio::sync::mpsc;

/// Receives notifications produced by committed game operations.
pub trait Notifier: Send + Sync {
    /// Hand one notification to the dispatcher. Must not block.
    fn dispatch(&self, notification: Notification);
}

/// A [`Notifier`] forwarding into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver the dispatcher reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.sender.send(notification) {
            tracing::warn!(player_id = %e.0.player_id, "Notification dispatcher is gone");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use farmhand_types::{ItemId, NotificationKind, PlayerId};

    use super::*;

    #[test]
    fn forwards_in_order() {
        let (notifier, mut receiver) = ChannelNotifier::channel();
        for amount in [3, 5] {
            notifier.dispatch(Notification {
                player_id: PlayerId(1),
                channel_id: None,
                item_id: ItemId(2),
                amount,
                fire_at: Utc::now(),
                kind: NotificationKind::HarvestReady,
            });
        }
        assert_eq!(receiver.try_recv().unwrap().amount, 3);
        assert_eq!(receiver.try_recv().unwrap().amount, 5);
    }

    #[test]
    fn closed_receiver_is_not_fatal() {
        let (notifier, receiver) = ChannelNotifier::channel();
        drop(receiver);
        notifier.dispatch(Notification {
            player_id: PlayerId(1),
            channel_id: None,
            item_id: ItemId(2),
            amount: 1,
            fire_at: Utc::now(),
            kind: NotificationKind::FactoryReady,
        });
    }
}
