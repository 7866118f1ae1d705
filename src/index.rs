//! # Profile Index
//!
//! Partition-aware membership index answering "which members belong to which
//! profile", both cluster-wide and restricted to the partitions this node owns.
//!
//! ## Architecture
//!
//! ```text
//! Global Index                              Local View
//! partition -> profile -> {members}         profile -> {members}
//!        │                                          ▲
//!        └──── set_owned_partitions(owned) ─────────┘
//!                    (full rebuild)
//! ```
//!
//! Both structures sit behind one `RwLock`: readers never observe the Local
//! View out of step with the Global Index, and a rebuild is never visible
//! half-done.

use crate::config::IndexConfig;
use crate::error::{IndexError, Result};
use crate::model::{EntityId, PartitionId};
use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument, warn};

type MemberSet = FxHashSet<EntityId>;
type ProfileMembers = FxHashMap<EntityId, MemberSet>;

/// Everything guarded by the index lock.
#[derive(Debug, Default)]
struct IndexState {
    /// partition -> profile -> members, as known cluster-wide
    global: FxHashMap<PartitionId, ProfileMembers>,
    /// profile -> members, restricted to `owned`
    local: ProfileMembers,
    /// Partitions assigned to this node by the last reassignment
    owned: FxHashSet<PartitionId>,
}

impl IndexState {
    /// Insert into the Global Index (and the Local View when `mine`).
    /// Returns true if the global membership is new.
    fn insert(
        &mut self,
        profile: EntityId,
        member: EntityId,
        partition: PartitionId,
        mine: bool,
    ) -> bool {
        if mine {
            self.local.entry(profile).or_default().insert(member);
        }
        self.global
            .entry(partition)
            .or_default()
            .entry(profile)
            .or_default()
            .insert(member)
    }

    /// Replace the Local View with the union of owned partitions' entries.
    fn rebuild_local(&mut self, owned: FxHashSet<PartitionId>) {
        let mut local = ProfileMembers::default();
        for partition in &owned {
            let Some(profiles) = self.global.get(partition) else {
                continue;
            };
            for (profile, members) in profiles {
                local
                    .entry(*profile)
                    .or_default()
                    .extend(members.iter().copied());
            }
        }
        self.local = local;
        self.owned = owned;
    }

    /// Returns the number of global memberships removed.
    fn remove_membership(
        &mut self,
        profile: &EntityId,
        member: &EntityId,
        prune: bool,
    ) -> usize {
        let mut removed = 0;
        for profiles in self.global.values_mut() {
            if remove_from(profiles, profile, member, prune) {
                removed += 1;
            }
        }
        remove_from(&mut self.local, profile, member, prune);
        if prune {
            self.prune_partitions();
        }
        removed
    }

    fn remove_member(&mut self, member: &EntityId, prune: bool) -> usize {
        let mut removed = 0;
        for profiles in self.global.values_mut() {
            removed += remove_everywhere(profiles, member, prune);
        }
        remove_everywhere(&mut self.local, member, prune);
        if prune {
            self.prune_partitions();
        }
        removed
    }

    fn remove_profile(&mut self, profile: &EntityId, prune: bool) -> usize {
        let mut removed = 0;
        for profiles in self.global.values_mut() {
            if let Some(members) = profiles.remove(profile) {
                removed += members.len();
            }
        }
        self.local.remove(profile);
        if prune {
            self.prune_partitions();
        }
        removed
    }

    fn prune_partitions(&mut self) {
        self.global.retain(|_, profiles| !profiles.is_empty());
    }
}

fn remove_from(
    map: &mut ProfileMembers,
    profile: &EntityId,
    member: &EntityId,
    prune: bool,
) -> bool {
    let Some(members) = map.get_mut(profile) else {
        return false;
    };
    let removed = members.remove(member);
    if prune && members.is_empty() {
        map.remove(profile);
    }
    removed
}

fn remove_everywhere(map: &mut ProfileMembers, member: &EntityId, prune: bool) -> usize {
    let mut removed = 0;
    for members in map.values_mut() {
        if members.remove(member) {
            removed += 1;
        }
    }
    if prune {
        map.retain(|_, members| !members.is_empty());
    }
    removed
}

fn sorted<T: Ord>(mut items: Vec<T>) -> Vec<T> {
    items.sort_unstable();
    items
}

/// Cumulative operation counters.
#[derive(Debug, Default)]
pub struct IndexMetrics {
    /// Global memberships that did not exist before an add
    pub memberships_added: AtomicU64,
    /// Global memberships dropped by removals
    pub memberships_removed: AtomicU64,
    /// Local View rebuilds triggered by reassignment
    pub rebuilds: AtomicU64,
    /// Adds rejected because the profile was a device
    pub rejected_profile_keys: AtomicU64,
    pub local_queries: AtomicU64,
}

/// Point-in-time size of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexStats {
    /// Partitions present in the Global Index
    pub partitions: usize,
    /// Distinct profiles across all partitions
    pub profiles: usize,
    pub global_memberships: usize,
    pub owned_partitions: usize,
    pub local_profiles: usize,
    pub local_memberships: usize,
}

/// Ordered deep copy of an index, taken under a single read lock.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexSnapshot {
    pub owned: BTreeSet<PartitionId>,
    pub global: BTreeMap<PartitionId, BTreeMap<EntityId, BTreeSet<EntityId>>>,
    pub local: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

fn ordered(map: &ProfileMembers) -> BTreeMap<EntityId, BTreeSet<EntityId>> {
    map.iter()
        .map(|(profile, members)| (*profile, members.iter().copied().collect()))
        .collect()
}

/// Partition-aware profile membership index for one tenant.
///
/// All mutations take the write lock for their whole duration; queries take
/// the read lock and hand back copies, never live views.
#[derive(Debug)]
pub struct ProfileIndex {
    state: RwLock<IndexState>,
    prune_empty_sets: bool,
    metrics: IndexMetrics,
}

impl Default for ProfileIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileIndex {
    /// Create an empty index with default configuration
    pub fn new() -> Self {
        Self::with_config(&IndexConfig::default())
    }

    pub fn with_config(config: &IndexConfig) -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            prune_empty_sets: config.prune_empty_sets,
            metrics: IndexMetrics::default(),
        }
    }

    /// Replace this node's partition ownership and rebuild the Local View.
    ///
    /// For an index handed out by a `ProfileIndexRegistry`, change ownership
    /// through the registry instead so every tenant stays in step.
    ///
    /// `partitions` is the complete new ownership, not a delta. The Local View
    /// is recomputed from the Global Index from scratch: a profile present in
    /// several owned partitions accumulates members from all of them.
    #[instrument(skip(self, partitions), level = "debug")]
    pub fn set_owned_partitions<I>(&self, partitions: I)
    where
        I: IntoIterator<Item = PartitionId>,
    {
        let owned: FxHashSet<PartitionId> = partitions.into_iter().collect();
        let owned_count = owned.len();

        let local_profiles = {
            let mut state = self.state.write();
            state.rebuild_local(owned);
            state.local.len()
        };

        self.metrics.rebuilds.fetch_add(1, Ordering::Relaxed);
        debug!(owned = owned_count, local_profiles, "Rebuilt local view");
    }

    /// Register `member` under `profile` in `partition`.
    ///
    /// When `mine` is set the membership also lands in the Local View. Fails
    /// with [`IndexError::DeviceProfileKey`] before touching any state if the
    /// profile is a device. Re-adding an existing membership is a no-op.
    pub fn add(
        &self,
        profile: EntityId,
        member: EntityId,
        partition: PartitionId,
        mine: bool,
    ) -> Result<()> {
        self.insert_checked(profile, member, partition, Some(mine))
            .map(|_| ())
    }

    /// Like [`add`](Self::add), deriving `mine` from the owned partitions
    /// under the same write lock. Returns whether the membership is local.
    pub fn track(
        &self,
        profile: EntityId,
        member: EntityId,
        partition: PartitionId,
    ) -> Result<bool> {
        self.insert_checked(profile, member, partition, None)
    }

    /// Move `member` from profile `from` to profile `to` atomically.
    ///
    /// `to` is validated first; a rejected move leaves the `from` membership
    /// in place.
    pub fn move_member(
        &self,
        from: EntityId,
        to: EntityId,
        member: EntityId,
        partition: PartitionId,
        mine: bool,
    ) -> Result<()> {
        self.relocate(from, to, member, partition, Some(mine))
            .map(|_| ())
    }

    /// Like [`move_member`](Self::move_member), deriving `mine` from the owned
    /// partitions. Returns whether the new membership is local.
    pub fn track_move(
        &self,
        from: EntityId,
        to: EntityId,
        member: EntityId,
        partition: PartitionId,
    ) -> Result<bool> {
        self.relocate(from, to, member, partition, None)
    }

    /// Drop `member` from `profile` in every partition and in the Local View.
    pub fn remove_membership(&self, profile: EntityId, member: EntityId) {
        let removed = self
            .state
            .write()
            .remove_membership(&profile, &member, self.prune_empty_sets);
        self.record_removed(removed);
    }

    /// Drop `member` from every profile, e.g. when the entity is deleted.
    pub fn remove_member(&self, member: EntityId) {
        let removed = self
            .state
            .write()
            .remove_member(&member, self.prune_empty_sets);
        self.record_removed(removed);
    }

    /// Drop `profile` and all of its members from every partition and the
    /// Local View. Members are not re-homed.
    pub fn remove_profile(&self, profile: EntityId) {
        let removed = self
            .state
            .write()
            .remove_profile(&profile, self.prune_empty_sets);
        self.record_removed(removed);
        debug!(%profile, removed, "Removed profile");
    }

    /// Members of `profile` in the partitions this node owns.
    ///
    /// Returns a copy; an absent profile yields an empty vector.
    pub fn local_members(&self, profile: &EntityId) -> Vec<EntityId> {
        self.metrics.local_queries.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        match state.local.get(profile) {
            Some(members) => {
                let mut result = Vec::with_capacity(members.len());
                result.extend(members.iter().copied());
                result
            }
            None => Vec::new(),
        }
    }

    /// Members of `profile` recorded under one partition of the Global Index.
    pub fn global_members(&self, partition: PartitionId, profile: &EntityId) -> Vec<EntityId> {
        let state = self.state.read();
        state
            .global
            .get(&partition)
            .and_then(|profiles| profiles.get(profile))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Partitions holding an entry for `profile`, in ascending order.
    pub fn partitions_for_profile(&self, profile: &EntityId) -> Vec<PartitionId> {
        let state = self.state.read();
        sorted(
            state
                .global
                .iter()
                .filter(|(_, profiles)| profiles.contains_key(profile))
                .map(|(partition, _)| *partition)
                .collect(),
        )
    }

    /// Partitions owned since the last reassignment, in ascending order.
    pub fn owned_partitions(&self) -> Vec<PartitionId> {
        sorted(self.state.read().owned.iter().copied().collect())
    }

    pub fn owns(&self, partition: PartitionId) -> bool {
        self.state.read().owned.contains(&partition)
    }

    pub fn stats(&self) -> IndexStats {
        let state = self.state.read();
        let mut profiles = FxHashSet::default();
        let mut global_memberships = 0;
        for partition_profiles in state.global.values() {
            for (profile, members) in partition_profiles {
                profiles.insert(*profile);
                global_memberships += members.len();
            }
        }
        IndexStats {
            partitions: state.global.len(),
            profiles: profiles.len(),
            global_memberships,
            owned_partitions: state.owned.len(),
            local_profiles: state.local.len(),
            local_memberships: state.local.values().map(|members| members.len()).sum(),
        }
    }

    pub fn snapshot(&self) -> IndexSnapshot {
        let state = self.state.read();
        IndexSnapshot {
            owned: state.owned.iter().copied().collect(),
            global: state
                .global
                .iter()
                .map(|(partition, profiles)| (*partition, ordered(profiles)))
                .collect(),
            local: ordered(&state.local),
        }
    }

    pub fn metrics(&self) -> &IndexMetrics {
        &self.metrics
    }

    /// `None` for `mine` derives locality from the owned partitions.
    fn insert_checked(
        &self,
        profile: EntityId,
        member: EntityId,
        partition: PartitionId,
        mine: Option<bool>,
    ) -> Result<bool> {
        self.check_profile_key(&profile)?;

        let (local, inserted) = {
            let mut state = self.state.write();
            let local = mine.unwrap_or_else(|| state.owned.contains(&partition));
            (local, state.insert(profile, member, partition, local))
        };

        if inserted {
            self.metrics.memberships_added.fetch_add(1, Ordering::Relaxed);
        }
        Ok(local)
    }

    fn relocate(
        &self,
        from: EntityId,
        to: EntityId,
        member: EntityId,
        partition: PartitionId,
        mine: Option<bool>,
    ) -> Result<bool> {
        self.check_profile_key(&to)?;

        let (local, removed, inserted) = {
            let mut state = self.state.write();
            let removed = state.remove_membership(&from, &member, self.prune_empty_sets);
            let local = mine.unwrap_or_else(|| state.owned.contains(&partition));
            let inserted = state.insert(to, member, partition, local);
            (local, removed, inserted)
        };

        self.record_removed(removed);
        if inserted {
            self.metrics.memberships_added.fetch_add(1, Ordering::Relaxed);
        }
        debug!(%member, %from, %to, %partition, local, "Moved member between profiles");
        Ok(local)
    }

    fn check_profile_key(&self, profile: &EntityId) -> Result<()> {
        IndexError::check_profile_key(profile).inspect_err(|_| {
            self.metrics
                .rejected_profile_keys
                .fetch_add(1, Ordering::Relaxed);
            warn!(%profile, "Rejected device id as profile key");
        })
    }

    fn record_removed(&self, removed: usize) {
        if removed > 0 {
            self.metrics
                .memberships_removed
                .fetch_add(removed as u64, Ordering::Relaxed);
        }
    }
}
