use profile_index::{EntityId, EntityType, PartitionId};

#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[allow(dead_code)]
pub fn profile() -> EntityId {
    EntityId::random(EntityType::DeviceProfile)
}

#[allow(dead_code)]
pub fn device() -> EntityId {
    EntityId::random(EntityType::Device)
}

#[allow(dead_code)]
pub fn sorted(mut members: Vec<EntityId>) -> Vec<EntityId> {
    members.sort();
    members
}

#[allow(dead_code)]
pub fn partitions(ids: &[u32]) -> Vec<PartitionId> {
    ids.iter().copied().map(PartitionId).collect()
}
