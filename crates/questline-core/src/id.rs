use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Handle to a quest-changed listener registered on a manager.
    pub struct ListenerId;

    /// Handle to a listener slot on the event bus.
    pub struct SubscriptionKey;
}

/// Identifies a quest in the catalog. Stable across sessions and save files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestId(pub u32);

impl std::fmt::Display for QuestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "quest#{}", self.0)
    }
}

/// Precomputed hash of a string identifier, compared instead of the string
/// on every event.
///
/// 32-bit FNV-1a over the UTF-8 bytes. Collisions are possible in theory:
/// two distinct identifiers with the same fingerprint are treated as the
/// same target by the progression engine and by save reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u32);

impl Fingerprint {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    /// Fingerprint an identifier.
    pub fn of(id: &str) -> Self {
        let mut hash = Self::FNV_OFFSET;
        for &b in id.as_bytes() {
            hash ^= b as u32;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
        }
        Self(hash)
    }
}

impl From<&str> for Fingerprint {
    fn from(id: &str) -> Self {
        Self::of(id)
    }
}
