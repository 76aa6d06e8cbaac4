//! Core type definitions for the Trowel offline sync core.
//!
//! This crate defines the fundamental, backend-agnostic types used
//! throughout the sync core:
//! - Local mutation identifiers (UUID v7) and domain names
//! - Millisecond timestamps
//! - Queued mutations and their kinds
//! - Record views (pending-local vs. server-confirmed)
//!
//! All domain-specific record shapes (artifacts, diary entries, site
//! reports, etc.) are opaque JSON here; the host application defines them.

mod ids;
mod record;
mod timestamp;

pub use ids::{Domain, LocalId};
pub use record::{MutationKind, QueueItem, RecordView, RemoteRecord};
pub use timestamp::Timestamp;
