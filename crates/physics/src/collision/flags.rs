//! Contact classification flags.
//!
//! Every face of the world mesh falls in exactly one contact class, decided
//! by the vertical component of its normal. Aggregated contacts combine
//! several classes into one set.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Maximum slope, in degrees from horizontal, still treated as a floor.
pub const FLOOR_ANGLE_DEGREES: f32 = 60.0;

/// Cosine threshold derived from [`FLOOR_ANGLE_DEGREES`].
#[inline]
pub fn floor_cosine() -> f32 {
    FLOOR_ANGLE_DEGREES.to_radians().cos()
}

/// Set of contact classes a face (or group of faces) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CollisionFlags(pub u32);

impl CollisionFlags {
    /// Empty set, used as the starting accumulator.
    pub const EMPTY: Self = Self(0);

    /// Walkable surface.
    pub const FLOOR: Self = Self(1 << 0);

    /// Downward facing surface.
    pub const CEILING: Self = Self(1 << 1);

    /// Anything too steep to be a floor or a ceiling.
    pub const WALLS: Self = Self(1 << 2);

    /// No contact at all.
    pub const NONE: Self = Self(1 << 3);

    /// Classify a face normal.
    pub fn from_normal(normal: Vec3) -> Self {
        let cosine = floor_cosine();
        if normal.y > cosine {
            Self::FLOOR
        } else if normal.y < -cosine {
            Self::CEILING
        } else {
            Self::WALLS
        }
    }

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given flags are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// True for the "no contact" marker.
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    /// True when no bit is set.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for CollisionFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for CollisionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for CollisionFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}
