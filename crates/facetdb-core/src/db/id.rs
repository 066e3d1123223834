use serde::{Deserialize, Serialize};
use std::fmt;

///
/// EntityId
///
/// Unsigned identifier for one logical object, unique among currently-live
/// entities. Numeric comparison is the sole ordering relation used anywhere
/// in the query engine.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct EntityId(u64);

impl EntityId {
    /// Lowest allocatable id; zero is reserved as the pre-allocation cursor.
    pub(crate) const MIN: Self = Self(1);

    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Next id in allocation order, wrapping past the end of the id space
    /// back to [`Self::MIN`].
    pub(crate) const fn wrapping_next(self) -> Self {
        match self.0.checked_add(1) {
            Some(raw) => Self(raw),
            None => Self::MIN,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_numerically() {
        assert!(EntityId::new(2) < EntityId::new(10));
    }

    #[test]
    fn wrapping_next_skips_zero() {
        assert_eq!(EntityId::new(3).wrapping_next(), EntityId::new(4));
        assert_eq!(EntityId::new(u64::MAX).wrapping_next(), EntityId::MIN);
    }

    #[test]
    fn display_is_the_raw_number() {
        assert_eq!(EntityId::new(42).to_string(), "42");
    }
}
