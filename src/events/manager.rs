//! Registry of live block subscriptions.

use dashmap::DashMap;
use uuid::Uuid;

use crate::blockchain::types::{SdkError, SdkResult};
use crate::events::subscriber::{BlockSubscriber, Subscription};
use crate::events::types::NewBlockEvent;

/// Owns every subscription opened through it, keyed by local id.
#[derive(Debug)]
pub struct SubscriptionManager {
    subscriber: BlockSubscriber,
    active: DashMap<Uuid, Subscription>,
}

impl SubscriptionManager {
    pub fn new(subscriber: BlockSubscriber) -> Self {
        Self {
            subscriber,
            active: DashMap::new(),
        }
    }

    /// Open a subscription and return its id.
    pub async fn subscribe<F>(&self, handler: F) -> SdkResult<Uuid>
    where
        F: Fn(NewBlockEvent) + Send + Sync + 'static,
    {
        let subscription = self.subscriber.subscribe(handler).await?;
        let id = subscription.id();
        self.active.insert(id, subscription);
        Ok(id)
    }

    pub async fn unsubscribe(&self, id: Uuid) -> SdkResult<()> {
        let (_, subscription) = self
            .active
            .remove(&id)
            .ok_or(SdkError::SubscriptionNotFound(id))?;
        subscription.unsubscribe().await;
        Ok(())
    }

    pub async fn unsubscribe_all(&self) {
        let ids: Vec<Uuid> = self.active.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, subscription)) = self.active.remove(&id) {
                subscription.unsubscribe().await;
            }
        }
    }

    /// Drop subscriptions whose background task has ended. Returns how many.
    pub fn prune(&self) -> usize {
        let before = self.active.len();
        self.active.retain(|id, subscription| {
            let alive = subscription.is_active();
            if !alive {
                tracing::info!(subscription_id = %id, "Removing ended subscription");
            }
            alive
        });
        before - self.active.len()
    }

    pub fn is_active(&self, id: &Uuid) -> bool {
        self.active.get(id).map(|s| s.is_active()).unwrap_or(false)
    }

    pub fn active_ids(&self) -> Vec<Uuid> {
        self.active.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
