//! Table-scoped change feed
//!
//! A publish/subscribe channel for row changes. Stores publish a
//! [`ChangeEvent`] after every committed write; subscribers register a
//! [`ChangeListener`] for one table and an [`EventFilter`] and get called for
//! every matching event until they unsubscribe.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Insert => write!(f, "INSERT"),
            ChangeKind::Update => write!(f, "UPDATE"),
            ChangeKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Which change kinds a subscription wants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    Insert,
    Update,
    Delete,
    All,
}

impl EventFilter {
    pub fn matches(self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::Insert => kind == ChangeKind::Insert,
            EventFilter::Update => kind == ChangeKind::Update,
            EventFilter::Delete => kind == ChangeKind::Delete,
            EventFilter::All => true,
        }
    }
}

/// A change to one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            table: table.into(),
            kind,
        }
    }
}

/// Handle returned by [`ChangeFeed::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Callback invoked for every matching change
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// Publish/subscribe interface over table changes
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Start delivering changes on `table` that pass `filter` to `listener`
    async fn subscribe(
        &self,
        table: &str,
        filter: EventFilter,
        listener: Arc<dyn ChangeListener>,
    ) -> crate::Result<SubscriptionId>;

    /// Stop a subscription. The listener is not called again once this returns.
    async fn unsubscribe(&self, id: SubscriptionId) -> crate::Result<()>;

    /// Announce a committed change to every subscriber
    fn publish(&self, event: ChangeEvent);
}

struct Subscription {
    table: String,
    filter: EventFilter,
    queue: mpsc::UnboundedSender<ChangeEvent>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// In-process change feed fanning every event out to per-subscription queues.
///
/// Queues are unbounded, so a slow listener delays its own events but never
/// loses one.
#[derive(Default)]
pub struct BroadcastChangeFeed {
    subscriptions: Mutex<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for BroadcastChangeFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastChangeFeed")
            .field("subscriptions", &self.subscription_count())
            .finish()
    }
}

impl BroadcastChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of open subscriptions
    pub fn subscription_count(&self) -> usize {
        self.subscriptions().len()
    }
}

#[async_trait]
impl ChangeFeed for BroadcastChangeFeed {
    async fn subscribe(
        &self,
        table: &str,
        filter: EventFilter,
        listener: Arc<dyn ChangeListener>,
    ) -> crate::Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (queue, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(listen(listener, receiver, cancel.clone()));

        self.subscriptions().insert(
            id,
            Subscription {
                table: table.to_string(),
                filter,
                queue,
                cancel,
                task,
            },
        );

        tracing::debug!("Subscription {} opened on '{}' ({:?})", id, table, filter);
        Ok(id)
    }

    async fn unsubscribe(&self, id: SubscriptionId) -> crate::Result<()> {
        let subscription = self
            .subscriptions()
            .remove(&id)
            .ok_or_else(|| crate::HeroBoardError::Realtime(format!("Unknown subscription {}", id)))?;

        subscription.cancel.cancel();
        if let Err(e) = subscription.task.await {
            tracing::warn!("Subscription {} ended abnormally: {}", id, e);
        }

        tracing::debug!("Subscription {} closed", id);
        Ok(())
    }

    fn publish(&self, event: ChangeEvent) {
        let subscriptions = self.subscriptions();
        let mut delivered = 0;
        for (id, subscription) in subscriptions.iter() {
            if subscription.table != event.table || !subscription.filter.matches(event.kind) {
                continue;
            }
            match subscription.queue.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => tracing::warn!("Subscription {} stopped listening", id),
            }
        }
        tracing::debug!(
            "Published {} on '{}' to {} subscriptions",
            event.kind,
            event.table,
            delivered
        );
    }
}

async fn listen(
    listener: Arc<dyn ChangeListener>,
    mut receiver: mpsc::UnboundedReceiver<ChangeEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = receiver.recv() => {
                match received {
                    Some(event) => listener.on_change(&event),
                    None => break,
                }
            }
        }
    }
}
