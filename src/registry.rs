//! # Profile Index Registry
//!
//! One [`ProfileIndex`] per tenant, all sharing this node's partition
//! ownership. The registry remembers the current ownership so that an index
//! created after a reassignment starts with the right Local View.
//!
//! Lock order: the ownership lock is always taken before any tenant map
//! entry, which serializes index creation against reassignment.

use crate::config::{ConfigError, IndexConfig};
use crate::error::{IndexError, Result};
use crate::events::MembershipEvent;
use crate::index::ProfileIndex;
use crate::model::{PartitionId, TenantId};
use crate::partition::PartitionResolver;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProfileIndexRegistry {
    config: IndexConfig,
    resolver: PartitionResolver,
    owned: RwLock<FxHashSet<PartitionId>>,
    indexes: DashMap<TenantId, Arc<ProfileIndex>>,
}

impl ProfileIndexRegistry {
    pub fn new(config: IndexConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let resolver = PartitionResolver::new(config.partition_count()?);
        Ok(Self {
            config,
            resolver,
            owned: RwLock::new(FxHashSet::default()),
            indexes: DashMap::new(),
        })
    }

    pub fn resolver(&self) -> &PartitionResolver {
        &self.resolver
    }

    /// Index for `tenant`, created and seeded with the current ownership on
    /// first use.
    ///
    /// Change ownership only through [`ProfileIndexRegistry::set_owned_partitions`].
    /// Calling `set_owned_partitions` on the returned index directly leaves it
    /// out of step with the other tenants and is undone by the next broadcast.
    pub fn index(&self, tenant: TenantId) -> Arc<ProfileIndex> {
        if let Some(index) = self.indexes.get(&tenant) {
            return Arc::clone(index.value());
        }

        let owned = self.owned.read();
        let entry = self.indexes.entry(tenant).or_insert_with(|| {
            let index = ProfileIndex::with_config(&self.config);
            index.set_owned_partitions(owned.iter().copied());
            debug!(%tenant, owned = owned.len(), "Created tenant profile index");
            Arc::new(index)
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, tenant: TenantId) -> Option<Arc<ProfileIndex>> {
        self.indexes
            .get(&tenant)
            .map(|index| Arc::clone(index.value()))
    }

    /// Forget a tenant's index. Returns false if there was none.
    pub fn remove_tenant(&self, tenant: TenantId) -> bool {
        let removed = self.indexes.remove(&tenant).is_some();
        if removed {
            debug!(%tenant, "Removed tenant profile index");
        }
        removed
    }

    /// Tenants with an index, in ascending order.
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self.indexes.iter().map(|entry| *entry.key()).collect();
        tenants.sort_unstable();
        tenants
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }

    /// Record this node's complete new ownership and rebuild every tenant's
    /// Local View.
    pub fn set_owned_partitions<I>(&self, partitions: I)
    where
        I: IntoIterator<Item = PartitionId>,
    {
        let mut owned = self.owned.write();
        *owned = partitions.into_iter().collect();
        for entry in self.indexes.iter() {
            entry.value().set_owned_partitions(owned.iter().copied());
        }
        debug!(
            owned = owned.len(),
            tenants = self.indexes.len(),
            "Applied partition ownership"
        );
    }

    /// Partitions owned by this node, in ascending order.
    pub fn owned_partitions(&self) -> Vec<PartitionId> {
        let mut owned: Vec<PartitionId> = self.owned.read().iter().copied().collect();
        owned.sort_unstable();
        owned
    }

    /// Apply a lifecycle event to `tenant`'s index.
    ///
    /// Removals for a tenant without an index are no-ops and create nothing.
    /// The profile key is checked before the tenant's index is looked up, so a
    /// rejected event never creates one.
    pub fn apply(&self, tenant: TenantId, event: &MembershipEvent) -> Result<()> {
        let index = if let Some(profile) = event.profile_key() {
            IndexError::check_profile_key(profile).inspect_err(|_| {
                warn!(%tenant, %profile, "Rejected membership event with device profile key");
            })?;
            self.index(tenant)
        } else {
            match self.get(tenant) {
                Some(index) => index,
                None => return Ok(()),
            }
        };

        match *event {
            MembershipEvent::Assigned {
                profile,
                member,
                partition,
            } => {
                let partition = partition.unwrap_or_else(|| self.resolver.partition_for(&member));
                index.track(profile, member, partition)?;
            }
            MembershipEvent::ProfileChanged {
                from,
                to,
                member,
                partition,
            } => {
                let partition = partition.unwrap_or_else(|| self.resolver.partition_for(&member));
                index.track_move(from, to, member, partition)?;
            }
            MembershipEvent::Unassigned { profile, member } => {
                index.remove_membership(profile, member);
            }
            MembershipEvent::EntityDeleted { entity } => index.remove_member(entity),
            MembershipEvent::ProfileDeleted { profile } => index.remove_profile(profile),
        }
        Ok(())
    }
}
