//! Resolution of entities to keyspace partitions.

use crate::model::{EntityId, PartitionId};
use std::num::NonZeroU32;

/// Maps entities onto a fixed number of partitions.
///
/// Only the entity uuid is hashed, so the partition of an entity never depends
/// on its category. The two halves of the uuid are folded with xor and reduced
/// modulo the partition count, so every node and every build agrees on the
/// partition of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionResolver {
    partitions: NonZeroU32,
}

impl PartitionResolver {
    pub fn new(partitions: NonZeroU32) -> Self {
        Self { partitions }
    }

    pub fn partition_count(&self) -> u32 {
        self.partitions.get()
    }

    /// Partition that owns `entity`.
    #[inline]
    pub fn partition_for(&self, entity: &EntityId) -> PartitionId {
        let bits = entity.id.as_u128();
        let folded = (bits >> 64) as u64 ^ bits as u64;
        PartitionId((folded % u64::from(self.partitions.get())) as u32)
    }
}
