//! # Profile Index
//!
//! A partition-aware, in-memory index of which member entities belong to which
//! profile entity, and which of those memberships fall into the partitions this
//! node owns.
//!
//! The index is derived and rebuildable: it is not a source of truth, performs
//! no I/O and does not survive a restart. Mutations come from the entity
//! lifecycle and from partition reassignment; reads ask for the local members
//! of a profile and vastly outnumber writes.

pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod model;
pub mod partition;
pub mod registry;

// Re-export main types for convenience
pub use config::{ConfigError, IndexConfig};
pub use error::IndexError;
pub use events::MembershipEvent;
pub use index::{IndexMetrics, IndexSnapshot, IndexStats, ProfileIndex};
pub use model::{EntityId, EntityType, PartitionId, TenantId};
pub use partition::PartitionResolver;
pub use registry::ProfileIndexRegistry;
