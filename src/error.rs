//! Errors surfaced by index operations.

use crate::model::EntityId;

/// Rejection of an index mutation.
///
/// Absence of a profile or member is never an error; the only failure is an
/// attempt to break the profile key invariant, which callers should treat as a
/// data-integrity problem rather than something to retry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invariant violation: device {profile} cannot be used as a profile key")]
    DeviceProfileKey { profile: EntityId },
}

impl IndexError {
    /// Reject a device id as a profile key; every other category passes.
    pub fn check_profile_key(profile: &EntityId) -> Result<()> {
        if profile.is_device() {
            return Err(IndexError::DeviceProfileKey { profile: *profile });
        }
        Ok(())
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, IndexError::DeviceProfileKey { .. })
    }
}

pub type Result<T> = std::result::Result<T, IndexError>;
