use core::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Per-shop capability bitmask.
///
/// Each bit grants one capability within a single shop. A requirement is met
/// only when *every* requested bit is present (`bits & mask == mask`), so a
/// mask can demand several capabilities at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleMask(u32);

impl RoleMask {
    pub const NONE: Self = Self(0);
    pub const MANAGE_ITEMS: Self = Self(1 << 0);
    pub const MANAGE_TABS: Self = Self(1 << 1);
    pub const MANAGE_ORDERS: Self = Self(1 << 2);
    pub const READ_TABS: Self = Self(1 << 3);
    pub const MANAGE_LOCATIONS: Self = Self(1 << 4);

    /// Every capability; what a shop owner effectively holds.
    pub const ALL: Self = Self(u32::MAX);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when all bits of `required` are set in `self`.
    pub const fn contains(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for RoleMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl core::fmt::Display for RoleMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:#07b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn conjunction_requires_every_bit() {
        let orders_only = RoleMask::MANAGE_ORDERS;
        let both = RoleMask::MANAGE_ORDERS | RoleMask::MANAGE_TABS;

        assert!(!orders_only.contains(both));
        assert!(both.contains(both));
        assert!(both.contains(RoleMask::MANAGE_TABS));
    }

    #[test]
    fn empty_mask_is_always_satisfied() {
        assert!(RoleMask::NONE.contains(RoleMask::NONE));
        assert!(!RoleMask::NONE.contains(RoleMask::READ_TABS));
    }

    proptest! {
        #[test]
        fn contains_matches_and_equals_mask(held in any::<u32>(), wanted in any::<u32>()) {
            let held_mask = RoleMask::from_bits(held);
            let wanted_mask = RoleMask::from_bits(wanted);
            prop_assert_eq!(held_mask.contains(wanted_mask), held & wanted == wanted);
        }

        #[test]
        fn union_contains_both_sides(a in any::<u32>(), b in any::<u32>()) {
            let joined = RoleMask::from_bits(a) | RoleMask::from_bits(b);
            prop_assert!(joined.contains(RoleMask::from_bits(a)));
            prop_assert!(joined.contains(RoleMask::from_bits(b)));
        }

        #[test]
        fn all_satisfies_any_requirement(wanted in any::<u32>()) {
            prop_assert!(RoleMask::ALL.contains(RoleMask::from_bits(wanted)));
        }
    }
}
