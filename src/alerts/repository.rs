//! Alert subscription storage (§6.1 Alert CRUD). The scheduler only
//! needs [`super::scheduler::SubscriptionRepository`]'s narrow read/write
//! pair; the HTTP surface needs full CRUD. One repository implements
//! both so a deployment wires a single persistence backend.

use crate::alerts::scheduler::SubscriptionRepository;
use crate::alerts::subscription::{AlertKind, AlertSubscription, Cadence};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[async_trait]
pub trait AlertRepository: Send + Sync {
    async fn list(&self) -> Vec<AlertSubscription>;
    async fn get(&self, id: Uuid) -> Option<AlertSubscription>;
    async fn create(&self, user_id: &str, ticker: &str, kind: AlertKind, cadence: Cadence) -> AlertSubscription;
    async fn update(&self, id: Uuid, active: bool) -> Option<AlertSubscription>;
    async fn delete(&self, id: Uuid) -> bool;
}

/// A process-local repository backed by a `RwLock<HashMap>`. The non-goal
/// on database schema migration (§1) leaves concrete persistence
/// unspecified; this is the reference implementation used by the `http`
/// and `alerts` tests and by `screenerd` until a deployment swaps in a
/// durable store behind the same trait.
#[derive(Default)]
pub struct InMemoryAlertRepository {
    subs: RwLock<HashMap<Uuid, AlertSubscription>>,
}

impl InMemoryAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlertRepository for InMemoryAlertRepository {
    async fn list(&self) -> Vec<AlertSubscription> {
        self.subs.read().unwrap().values().cloned().collect()
    }

    async fn get(&self, id: Uuid) -> Option<AlertSubscription> {
        self.subs.read().unwrap().get(&id).cloned()
    }

    async fn create(&self, user_id: &str, ticker: &str, kind: AlertKind, cadence: Cadence) -> AlertSubscription {
        let sub = AlertSubscription::new(user_id, ticker, kind, cadence);
        self.subs.write().unwrap().insert(sub.id, sub.clone());
        sub
    }

    async fn update(&self, id: Uuid, active: bool) -> Option<AlertSubscription> {
        let mut subs = self.subs.write().unwrap();
        let sub = subs.get_mut(&id)?;
        sub.active = active;
        Some(sub.clone())
    }

    async fn delete(&self, id: Uuid) -> bool {
        self.subs.write().unwrap().remove(&id).is_some()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemoryAlertRepository {
    async fn due(&self, cadence: Cadence) -> Vec<AlertSubscription> {
        self.subs
            .read()
            .unwrap()
            .values()
            .filter(|s| s.active && s.cadence == cadence)
            .cloned()
            .collect()
    }

    async fn record_fired(&self, id: Uuid, at: DateTime<Utc>) {
        if let Some(sub) = self.subs.write().unwrap().get_mut(&id) {
            sub.last_fired_at = Some(at);
            sub.last_evaluated = Some(at);
            sub.trigger_count += 1;
        }
    }

    async fn record_evaluated(&self, id: Uuid, at: DateTime<Utc>) {
        if let Some(sub) = self.subs.write().unwrap().get_mut(&id) {
            sub.last_evaluated = Some(at);
        }
    }
}
