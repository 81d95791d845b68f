use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

/// Named reasons why a tag value is considered invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InvalidReason {
    /// Value never initialised
    Unknown,
    /// Value outside the declared bounds
    ValueOutOfBounds,
    /// Owning process is down
    ProcessDown,
    /// Owning equipment is down
    EquipmentDown,
    /// Source unreachable
    Inaccessible,
    /// Invalidated without a specific reason
    UnknownReason,
}

/// Composite validity descriptor for a tag value.
///
/// A quality is valid iff no invalid reason is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality {
    invalid_reasons: BTreeSet<InvalidReason>,
}

impl Quality {
    /// A valid quality (no invalid reasons).
    pub fn valid() -> Self {
        Self::default()
    }

    pub fn invalid(reason: InvalidReason) -> Self {
        let mut quality = Self::default();
        quality.invalidate(reason);
        quality
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reasons.is_empty()
    }

    /// Adds an invalid reason; idempotent.
    pub fn invalidate(
        &mut self,
        reason: InvalidReason,
    ) {
        self.invalid_reasons.insert(reason);
    }

    /// Clears one invalid reason.
    pub fn clear(
        &mut self,
        reason: InvalidReason,
    ) {
        self.invalid_reasons.remove(&reason);
    }

    /// Clears all invalid reasons, making the quality valid.
    pub fn validate(&mut self) {
        self.invalid_reasons.clear();
    }

    pub fn has_reason(
        &self,
        reason: InvalidReason,
    ) -> bool {
        self.invalid_reasons.contains(&reason)
    }
}
