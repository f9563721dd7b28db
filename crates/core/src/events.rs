//! Typed in-process publish/subscribe with bounded history. See
//! `SPEC_FULL.md` §4.11 / §6 for the contract.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use recon_domain::{Event, EventType};

const DEFAULT_MAX_HISTORY: usize = 1000;

pub type SyncSubscriber = Arc<dyn Fn(&Event) + Send + Sync>;
pub type AsyncSubscriber = Arc<dyn Fn(Event) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Opaque handle returned by `subscribe`/`subscribe_async`, needed to
/// unsubscribe later since Rust closures carry no stable identity to
/// compare against (unlike the source's `list.remove(callback)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

enum Subscriber {
    Sync(SubscriptionId, SyncSubscriber),
    Async(SubscriptionId, AsyncSubscriber),
}

pub struct EventBus {
    subscribers: RwLock<HashMap<EventType, Vec<Subscriber>>>,
    history: RwLock<VecDeque<Event>>,
    max_history: usize,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_HISTORY)
    }

    pub fn with_capacity(max_history: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            history: RwLock::new(VecDeque::new()),
            max_history,
            next_id: AtomicU64::new(0),
        }
    }

    fn alloc_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn subscribe(&self, event_type: EventType, callback: SyncSubscriber) -> SubscriptionId {
        let id = self.alloc_id();
        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push(Subscriber::Sync(id, callback));
        id
    }

    pub fn subscribe_async(&self, event_type: EventType, callback: AsyncSubscriber) -> SubscriptionId {
        let id = self.alloc_id();
        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push(Subscriber::Async(id, callback));
        id
    }

    pub fn unsubscribe(&self, event_type: EventType, id: SubscriptionId) {
        if let Some(subs) = self.subscribers.write().get_mut(&event_type) {
            subs.retain(|s| match s {
                Subscriber::Sync(sid, _) | Subscriber::Async(sid, _) => *sid != id,
            });
        }
    }

    /// Record the event and dispatch to subscribers in registration order,
    /// awaiting each async subscriber before moving to the next so that
    /// ordering is preserved across the sync/async mix.
    pub async fn publish(&self, event: Event) {
        {
            let mut history = self.history.write();
            history.push_back(event.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        let callbacks: Vec<Subscriber> = {
            let subs = self.subscribers.read();
            subs.get(&event.event_type).cloned().unwrap_or_default()
        };

        for sub in callbacks {
            match sub {
                Subscriber::Sync(_, cb) => cb(&event),
                Subscriber::Async(_, cb) => cb(event.clone()).await,
            }
        }
    }

    pub fn history(&self, event_type: Option<EventType>, limit: Option<usize>) -> Vec<Event> {
        let history = self.history.read();
        let mut filtered: Vec<Event> = match event_type {
            Some(t) => history.iter().filter(|e| e.event_type == t).cloned().collect(),
            None => history.iter().cloned().collect(),
        };
        if let Some(limit) = limit {
            let start = filtered.len().saturating_sub(limit);
            filtered = filtered.split_off(start);
        }
        filtered
    }

    pub fn clear_history(&self) {
        self.history.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Subscriber {
    fn clone(&self) -> Self {
        match self {
            Subscriber::Sync(id, cb) => Subscriber::Sync(*id, cb.clone()),
            Subscriber::Async(id, cb) => Subscriber::Async(*id, cb.clone()),
        }
    }
}
