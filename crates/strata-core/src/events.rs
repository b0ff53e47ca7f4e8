//! Recorder event types and the event bus queried before dispatch.
//!
//! The recorder emits one event per journal mutation — but only when a
//! listener has registered interest in that entity type and mutation kind.
//! Dispatch is synchronous and attempt-only: it happens before the recorder
//! returns, inside the caller's ambient transaction, and a lagging or
//! dropped receiver never fails the write. Listeners that perform their own
//! I/O are themselves responsible for transactional correctness.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::defaults;

/// The three sanctioned journal mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Insert => "insert",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

/// A domain event describing one journal mutation.
#[derive(Debug, Clone, Serialize)]
pub struct RecorderEvent {
    /// UUIDv7 event id (time-ordered).
    pub event_id: Uuid,
    /// Emission instant.
    pub at: DateTime<Utc>,
    /// Logical entity name the mutation applied to.
    pub entity: String,
    /// Mutation kind.
    pub kind: MutationKind,
    /// Row id the mutation applied to.
    pub entity_id: i64,
    /// Inserted or changed fields, when cheap to render.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl RecorderEvent {
    pub fn new(
        entity: impl Into<String>,
        kind: MutationKind,
        entity_id: i64,
        payload: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            at: Utc::now(),
            entity: entity.into(),
            kind,
            entity_id,
            payload,
        }
    }
}

/// Listener registry plus broadcast fan-out for recorder events.
///
/// Interests are registered for the lifetime of the engine; the
/// `(entity, kind)` key set is what the recorder consults before
/// constructing an event. Each subscriber gets its own independent stream.
pub struct RecorderEventBus {
    tx: broadcast::Sender<RecorderEvent>,
    interests: RwLock<HashSet<(String, MutationKind)>>,
    catch_all: AtomicUsize,
}

impl RecorderEventBus {
    /// Create a new event bus with the given buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            interests: RwLock::new(HashSet::new()),
            catch_all: AtomicUsize::new(0),
        }
    }

    /// Register a listener for one entity type and mutation kind.
    pub fn register_interest(
        &self,
        entity: &str,
        kind: MutationKind,
    ) -> broadcast::Receiver<RecorderEvent> {
        let mut interests = match self.interests.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        interests.insert((entity.to_string(), kind));
        drop(interests);
        self.tx.subscribe()
    }

    /// Register a listener for every event.
    pub fn subscribe_all(&self) -> broadcast::Receiver<RecorderEvent> {
        self.catch_all.fetch_add(1, Ordering::Relaxed);
        self.tx.subscribe()
    }

    /// Whether any listener is registered for this entity type and mutation
    /// kind. Gates event construction in the recorder.
    pub fn has_listeners(&self, entity: &str, kind: MutationKind) -> bool {
        if self.tx.receiver_count() == 0 {
            return false;
        }
        if self.catch_all.load(Ordering::Relaxed) > 0 {
            return true;
        }
        let interests = match self.interests.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        interests.contains(&(entity.to_string(), kind))
    }

    /// Dispatch an event to all subscribers. Attempt-only: the result of the
    /// send is intentionally ignored.
    pub fn emit(&self, event: RecorderEvent) {
        tracing::debug!(
            subsystem = "db",
            component = "events",
            op = event.kind.as_str(),
            entity = %event.entity,
            entity_id = event.entity_id,
            subscriber_count = self.tx.receiver_count(),
            "recorder event emit"
        );
        let _ = self.tx.send(event);
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RecorderEventBus {
    fn default() -> Self {
        Self::new(defaults::EVENT_BUS_CAPACITY)
    }
}
