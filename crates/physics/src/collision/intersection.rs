//! Per-query contact records and the fixed-capacity buffer holding them.

use thiserror::Error;

use super::flags::CollisionFlags;

/// Capacity of every per-frame contact buffer and BVH leaf query.
pub const MAX_INTERSECTIONS: usize = 256;

/// Errors raised by collision queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollisionError {
    /// More contacts or leaf nodes than a fixed buffer can hold.
    ///
    /// Truncating would corrupt the bucket math, so the query fails instead.
    #[error("collision buffer capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: usize },
}

/// One face hit by a swept capsule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionInfo {
    /// Fraction of the displacement at which contact happens.
    ///
    /// - `1.0` = no impact found (sentinel)
    /// - `0.0` = touching at the start of the sweep
    pub time: f32,

    /// Contact class of the face.
    pub flags: CollisionFlags,

    /// Index of the face in the BVH face array.
    pub bvh_face_index: u32,
}

impl IntersectionInfo {
    /// "Nothing hit" marker.
    pub const NONE: Self = Self {
        time: 1.0,
        flags: CollisionFlags::NONE,
        bvh_face_index: u32::MAX,
    };

    pub fn new(time: f32, flags: CollisionFlags, bvh_face_index: u32) -> Self {
        Self {
            time,
            flags,
            bvh_face_index,
        }
    }
}

impl Default for IntersectionInfo {
    fn default() -> Self {
        Self::NONE
    }
}

/// Scratch buffer of contacts, allocated on the stack and reused per query.
#[derive(Debug, Clone)]
pub struct IntersectionData {
    pub hits: [IntersectionInfo; MAX_INTERSECTIONS],
    pub count: usize,
}

impl Default for IntersectionData {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectionData {
    pub fn new() -> Self {
        Self {
            hits: [IntersectionInfo::NONE; MAX_INTERSECTIONS],
            count: 0,
        }
    }

    /// Drop all hits and reset the first slot to the sentinel.
    pub fn clear(&mut self) {
        self.count = 0;
        self.hits[0] = IntersectionInfo::NONE;
    }

    /// Append a hit, failing once the buffer is full.
    pub fn push(&mut self, info: IntersectionInfo) -> Result<(), CollisionError> {
        if self.count >= MAX_INTERSECTIONS {
            return Err(CollisionError::CapacityExceeded {
                capacity: MAX_INTERSECTIONS,
            });
        }

        self.hits[self.count] = info;
        self.count += 1;
        Ok(())
    }

    /// Live hits.
    #[inline]
    pub fn as_slice(&self) -> &[IntersectionInfo] {
        &self.hits[..self.count]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Earliest impact time, `1.0` when nothing was hit.
    #[inline]
    pub fn time_of_impact(&self) -> f32 {
        self.hits[0].time
    }

    /// First hit flagged exactly as a floor.
    pub fn first_floor(&self) -> Option<IntersectionInfo> {
        self.as_slice()
            .iter()
            .copied()
            .find(|hit| hit.flags == CollisionFlags::FLOOR)
    }

    /// Union of the flags of all live hits.
    pub fn flags(&self) -> CollisionFlags {
        self.as_slice()
            .iter()
            .fold(CollisionFlags::EMPTY, |acc, hit| acc | hit.flags)
    }

    /// Keep only hits matching `keep`, preserving order. Returns the new count.
    pub fn retain(&mut self, mut keep: impl FnMut(&IntersectionInfo) -> bool) -> usize {
        let mut count = 0;
        for i in 0..self.count {
            if keep(&self.hits[i]) {
                self.hits[count] = self.hits[i];
                count += 1;
            }
        }
        self.count = count;
        count
    }
}
