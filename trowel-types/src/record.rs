//! Mutation and record types for the offline queue.
//!
//! A `QueueItem` is a pending mutation awaiting remote commit. The payload
//! is opaque JSON — the queue has no knowledge of what an artifact or a
//! diary entry looks like. A `RecordView` is what the read path hands to
//! the UI: either a locally pending payload or a server-confirmed record,
//! distinguished by an explicit variant rather than an ad hoc flag field.

use crate::{LocalId, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The kind of mutation a queue item represents.
///
/// The queue and orchestrator treat all kinds identically; only the
/// remote backend interprets them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    /// Create a new record in the collection.
    Create,
    /// Replace an existing record.
    Update,
    /// Delete a record.
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A pending mutation awaiting remote commit.
///
/// Lives in the offline queue from enqueue until it is either committed
/// and removed, dead-lettered, or explicitly discarded by the user. It is
/// never silently dropped on a transient failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Unique id, generated at enqueue time. Never reused.
    pub local_id: LocalId,
    /// What the mutation does.
    pub kind: MutationKind,
    /// The domain record being written. Opaque to the queue.
    pub payload: Value,
    /// When the item was enqueued.
    pub created_at: Timestamp,
    /// Number of prior sync attempts.
    pub attempts: u32,
}

impl QueueItem {
    /// Creates a new queue item with a fresh id and zero attempts.
    #[must_use]
    pub fn new(kind: MutationKind, payload: Value) -> Self {
        Self {
            local_id: LocalId::new(),
            kind,
            payload,
            created_at: Timestamp::now(),
            attempts: 0,
        }
    }
}

/// A record as confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Server-issued identifier.
    pub id: String,
    /// The record body.
    pub data: Value,
}

impl RemoteRecord {
    /// Creates a remote record.
    #[must_use]
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// A record as seen by the read path.
///
/// Pending records come from the offline queue and have not been accepted
/// by the server yet; confirmed records have. The distinction is an
/// explicit tagged variant so callers cannot confuse the two shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordView {
    /// A locally queued mutation, not yet committed.
    Pending {
        /// The queue item's id, usable to discard the mutation.
        local_id: LocalId,
        /// The payload as the user wrote it.
        payload: Value,
    },
    /// A record the server has confirmed.
    Confirmed {
        /// The confirmed record.
        record: RemoteRecord,
    },
}

impl RecordView {
    /// Returns true for locally pending records.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// The record body, whichever side it comes from.
    #[must_use]
    pub fn data(&self) -> &Value {
        match self {
            Self::Pending { payload, .. } => payload,
            Self::Confirmed { record } => &record.data,
        }
    }
}
