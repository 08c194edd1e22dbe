use std::collections::HashMap;
use std::sync::Arc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;
use crate::errors::ManagerError;
use super::events::Notification;

pub type ChannelId = Uuid;

/// Sending half of one live notification connection.
///
/// The receiving half is drained by the connection's writer task; once that
/// task ends the receiver is dropped and every later delivery fails.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    id: ChannelId,
    sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { id: Uuid::new_v4(), sender }, receiver)
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    fn deliver(&self, event: &Notification) -> Result<(), ManagerError> {
        self.sender
            .send(event.clone())
            .map_err(|_| ManagerError::Delivery(format!("Channel {} is closed", self.id)))
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub pruned: Vec<ChannelId>,
}

/// User id → open notification channels.
#[derive(Clone, Default)]
pub struct ChannelRegistry {
    channels: Arc<DashMap<i64, HashMap<ChannelId, NotificationChannel>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if this channel was already registered for the user.
    pub fn register(&self, user_id: i64, channel: NotificationChannel) -> bool {
        let channel_id = channel.id();
        let inserted = self.channels
            .entry(user_id)
            .or_default()
            .insert(channel_id, channel)
            .is_none();
        debug!(user_id, channel = %channel_id, inserted, "Registered notification channel");
        inserted
    }

    /// Removes the channel and drops the user entry once it has no channels left.
    pub fn unregister(&self, user_id: i64, channel_id: ChannelId) -> bool {
        let removed = match self.channels.get_mut(&user_id) {
            Some(mut set) => set.remove(&channel_id).is_some(),
            None => false,
        };
        // Emptiness is rechecked under the shard lock; a concurrent register wins.
        self.channels.remove_if(&user_id, |_, set| set.is_empty());
        if removed {
            debug!(user_id, channel = %channel_id, "Unregistered notification channel");
        }
        removed
    }

    /// Delivers `event` to every channel of `user_id`. Channels that fail are
    /// pruned and reported; they never affect delivery to the others.
    pub fn broadcast(&self, user_id: i64, event: &Notification) -> DeliveryReport {
        // Snapshot under the shard lock, deliver after releasing it.
        let targets: Vec<NotificationChannel> = match self.channels.get(&user_id) {
            Some(set) => set.values().cloned().collect(),
            None => return DeliveryReport::default(),
        };

        let mut report = DeliveryReport::default();
        for channel in targets {
            match channel.deliver(event) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(user_id, channel = %channel.id(), event = event.event_type(), error = %e, "Dropping dead notification channel");
                    report.pruned.push(channel.id());
                }
            }
        }

        for channel_id in &report.pruned {
            self.unregister(user_id, *channel_id);
        }
        report
    }

    pub fn channel_count(&self, user_id: i64) -> usize {
        self.channels.get(&user_id).map(|set| set.len()).unwrap_or(0)
    }

    pub fn user_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_registered(&self, user_id: i64) -> bool {
        self.channels.contains_key(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentStatus;
    use crate::tracker::events::AgentUpdate;

    fn event(id: i64) -> Notification {
        Notification::AgentUpdate(AgentUpdate {
            id,
            name: "scout".into(),
            status: AgentStatus::Running,
            last_active: None,
        })
    }

    #[test]
    fn test_broadcast_reaches_every_channel() {
        let registry = ChannelRegistry::new();
        let (a, mut rx_a) = NotificationChannel::new();
        let (b, mut rx_b) = NotificationChannel::new();
        registry.register(7, a);
        registry.register(7, b);

        let report = registry.broadcast(7, &event(1));
        assert_eq!(report.delivered, 2);
        assert!(report.pruned.is_empty());
        assert_eq!(rx_a.try_recv().unwrap(), event(1));
        assert_eq!(rx_b.try_recv().unwrap(), event(1));
    }

    #[test]
    fn test_failed_channel_is_pruned_and_others_still_receive() {
        let registry = ChannelRegistry::new();
        let (a, rx_a) = NotificationChannel::new();
        let (b, mut rx_b) = NotificationChannel::new();
        let dead_id = a.id();
        registry.register(7, a);
        registry.register(7, b);
        drop(rx_a);

        let report = registry.broadcast(7, &event(1));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.pruned, vec![dead_id]);
        assert_eq!(rx_b.try_recv().unwrap(), event(1));
        assert_eq!(registry.channel_count(7), 1);
        assert!(!registry.unregister(7, dead_id));
    }

    #[test]
    fn test_unregister_last_channel_removes_user() {
        let registry = ChannelRegistry::new();
        let (a, _rx) = NotificationChannel::new();
        let id = a.id();
        registry.register(7, a);
        assert!(registry.is_registered(7));

        assert!(registry.unregister(7, id));
        assert!(!registry.is_registered(7));
        assert_eq!(registry.user_count(), 0);
        assert_eq!(registry.broadcast(7, &event(1)), DeliveryReport::default());
    }

    #[test]
    fn test_register_is_idempotent_per_channel() {
        let registry = ChannelRegistry::new();
        let (a, mut rx) = NotificationChannel::new();
        assert!(registry.register(7, a.clone()));
        assert!(!registry.register(7, a));
        assert_eq!(registry.channel_count(7), 1);

        registry.broadcast(7, &event(1));
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_broadcast_is_scoped_to_user() {
        let registry = ChannelRegistry::new();
        let (mine, mut rx_mine) = NotificationChannel::new();
        let (theirs, mut rx_theirs) = NotificationChannel::new();
        registry.register(7, mine);
        registry.register(8, theirs);

        registry.broadcast(7, &event(1));
        assert!(rx_mine.try_recv().is_ok());
        assert!(rx_theirs.try_recv().is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_register_unregister_broadcast() {
        let registry = ChannelRegistry::new();
        let (stable, mut rx_stable) = NotificationChannel::new();
        registry.register(1, stable);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..200 {
                    let (channel, rx) = NotificationChannel::new();
                    let id = channel.id();
                    registry.register(1, channel);
                    drop(rx);
                    registry.unregister(1, id);
                }
            }));
        }
        let broadcaster = {
            let registry = registry.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    registry.broadcast(1, &event(i));
                    tokio::task::yield_now().await;
                }
            })
        };
        for handle in handles {
            handle.await.unwrap();
        }
        broadcaster.await.unwrap();

        assert_eq!(registry.channel_count(1), 1);
        let mut received = 0;
        while rx_stable.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, 200);
    }
}
