//! # Data Model
//!
//! Identifiers for the entities tracked by the profile index: typed entity ids,
//! tenants and partitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Compact identifier for a partition of the cluster keyspace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(pub u32);

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Identifier of the tenant an index belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

impl TenantId {
    pub fn random() -> Self {
        TenantId(Uuid::new_v4())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Category of an entity.
///
/// `Device` is reserved: a device groups nothing, so it can never act as a
/// profile key in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Tenant,
    Customer,
    User,
    Dashboard,
    Asset,
    Device,
    EntityView,
    Edge,
    DeviceProfile,
    AssetProfile,
    RuleChain,
    Alarm,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Tenant => "TENANT",
            EntityType::Customer => "CUSTOMER",
            EntityType::User => "USER",
            EntityType::Dashboard => "DASHBOARD",
            EntityType::Asset => "ASSET",
            EntityType::Device => "DEVICE",
            EntityType::EntityView => "ENTITY_VIEW",
            EntityType::Edge => "EDGE",
            EntityType::DeviceProfile => "DEVICE_PROFILE",
            EntityType::AssetProfile => "ASSET_PROFILE",
            EntityType::RuleChain => "RULE_CHAIN",
            EntityType::Alarm => "ALARM",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed entity identifier.
///
/// Ordering is by entity type first, then by uuid, which keeps snapshots and
/// sorted listings grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    /// The category of the entity (e.g. device, asset profile)
    pub entity_type: EntityType,
    /// Unique identifier within the cluster
    pub id: Uuid,
}

impl EntityId {
    /// Create a new entity identifier
    pub fn new(entity_type: EntityType, id: Uuid) -> Self {
        Self { entity_type, id }
    }

    /// Create an identifier with a freshly generated v4 uuid
    pub fn random(entity_type: EntityType) -> Self {
        Self::new(entity_type, Uuid::new_v4())
    }

    pub fn is_device(&self) -> bool {
        self.entity_type == EntityType::Device
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}
