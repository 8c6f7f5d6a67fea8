//! Reduction of raw impact hits to a canonical contact set.
//!
//! A single physical surface is often sampled by several triangles, and
//! non-manifold geometry produces coincident faces with opposite facing (a
//! thin wall seen from both sides, a floor glued to a ceiling). Hits are
//! first grouped into buckets of coplanar, same-facing faces. Opposite
//! facing bucket pairs then cancel, and finally contacts the velocity moves
//! away from are dropped.
//!
//! Buckets are not allocated: they are counts and offsets over the hit
//! array, which is reordered so that each bucket is a contiguous run.

use glam::Vec3;

use super::bvh::Bvh;
use super::flags::CollisionFlags;
use super::geometry::{classify_planes, classify_point_halfspace, Halfspace, PlaneClassification, EPSILON_LOW};
use super::intersection::{IntersectionData, IntersectionInfo, MAX_INTERSECTIONS};
use crate::debug::{DebugColor, DebugSink};

/// Flag classes that may cancel each other.
const CANCELLING_CLASSES: [CollisionFlags; 2] = [
    CollisionFlags::WALLS,
    CollisionFlags(CollisionFlags::FLOOR.0 | CollisionFlags::CEILING.0),
];

/// Runs of coplanar hits inside an [`IntersectionData`].
#[derive(Debug, Clone)]
pub struct Buckets {
    counts: [u32; MAX_INTERSECTIONS],
    offsets: [u32; MAX_INTERSECTIONS],
    len: usize,
}

impl Buckets {
    fn new() -> Self {
        Self {
            counts: [0; MAX_INTERSECTIONS],
            offsets: [0; MAX_INTERSECTIONS],
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of hits in bucket `index`.
    #[inline]
    pub fn count(&self, index: usize) -> usize {
        self.counts[index] as usize
    }

    /// Hit indices covered by bucket `index`.
    #[inline]
    pub fn range(&self, index: usize) -> std::ops::Range<usize> {
        let start = self.offsets[index] as usize;
        start..start + self.counts[index] as usize
    }

    /// First hit of a bucket, which stands for the whole bucket.
    #[inline]
    fn representative<'a>(&self, data: &'a IntersectionData, index: usize) -> &'a IntersectionInfo {
        &data.hits[self.offsets[index] as usize]
    }

    fn rebuild_offsets(&mut self) {
        let mut offset = 0;
        for i in 0..self.len {
            self.offsets[i] = offset;
            offset += self.counts[i];
        }
    }
}

/// Reorder hits into runs of coplanar, same-facing faces.
///
/// Faces are taken back to front; each one starts a bucket and pulls in
/// every remaining face colinear with it. Order between buckets carries no
/// meaning.
pub fn sort_in_buckets(bvh: &Bvh, data: &mut IntersectionData) -> Buckets {
    let mut buckets = Buckets::new();
    let mut sorted = [IntersectionInfo::NONE; MAX_INTERSECTIONS];
    let mut taken = [false; MAX_INTERSECTIONS];
    let mut sorted_count = 0;

    for i in (0..data.count).rev() {
        if taken[i] {
            continue;
        }

        let reference = data.hits[i].bvh_face_index as usize;
        let face = bvh.face(reference);
        let normal = bvh.normal(reference);

        taken[i] = true;
        sorted[sorted_count] = data.hits[i];
        sorted_count += 1;
        buckets.counts[buckets.len] = 1;

        for j in (0..i).rev() {
            if taken[j] {
                continue;
            }

            let other = data.hits[j].bvh_face_index as usize;
            if classify_planes(face, normal, bvh.face(other), bvh.normal(other))
                == PlaneClassification::Colinear
            {
                taken[j] = true;
                sorted[sorted_count] = data.hits[j];
                sorted_count += 1;
                buckets.counts[buckets.len] += 1;
            }
        }

        buckets.len += 1;
    }

    debug_assert_eq!(sorted_count, data.count);
    data.hits[..sorted_count].copy_from_slice(&sorted[..sorted_count]);
    buckets.rebuild_offsets();
    buckets
}

/// Whether bucket `bucket_index` is split by the rest of its class.
///
/// Every other bucket matching `flag`, except `excluded_index`, acts as a
/// plane. The bucket is split if one of its faces straddles such a plane,
/// or if its faces sit on both sides of it. Faces lying on the plane count
/// as being in front.
pub fn classify_buckets(
    bvh: &Bvh,
    data: &IntersectionData,
    buckets: &Buckets,
    flag: CollisionFlags,
    bucket_index: usize,
    excluded_index: usize,
) -> bool {
    debug_assert!(!buckets.is_empty());

    for i in 0..buckets.len() {
        if i == bucket_index || i == excluded_index {
            continue;
        }

        let plane = buckets.representative(data, i);
        if !plane.flags.intersects(flag) {
            continue;
        }

        let plane_face = bvh.face(plane.bvh_face_index as usize);
        let plane_normal = bvh.normal(plane.bvh_face_index as usize);
        let mut faces_in_front = 0;
        let mut faces_to_back = 0;

        for hit in &data.hits[buckets.range(bucket_index)] {
            let target = bvh.face(hit.bvh_face_index as usize);
            let (mut in_front, mut to_back) = (0, 0);
            for point in target.points {
                match classify_point_halfspace(plane_face, plane_normal, point) {
                    Halfspace::Front => in_front += 1,
                    Halfspace::Back => to_back += 1,
                    Halfspace::On => {}
                }
            }

            if in_front > 0 && to_back > 0 {
                return true;
            } else if to_back > 0 {
                faces_to_back += 1;
            } else {
                faces_in_front += 1;
            }

            if faces_in_front > 0 && faces_to_back > 0 {
                return true;
            }
        }
    }

    false
}

/// Excise bucket `bucket_index` and its hits, compacting everything after it.
///
/// Returns the remaining number of hits.
pub fn remove_bucket(
    bvh: &Bvh,
    data: &mut IntersectionData,
    buckets: &mut Buckets,
    bucket_index: usize,
    debug: &mut dyn DebugSink,
) -> usize {
    debug_assert!(bucket_index < buckets.len());

    let removed = buckets.range(bucket_index);

    if debug.flags().draw_ignored_faces {
        for hit in &data.hits[removed.clone()] {
            let i = hit.bvh_face_index as usize;
            debug.record_face(bvh.face(i), bvh.normal(i), DebugColor::YELLOW, 2);
        }
    }

    data.hits.copy_within(removed.end..data.count, removed.start);
    data.count -= removed.len();

    buckets.counts.copy_within(bucket_index + 1..buckets.len, bucket_index);
    buckets.len -= 1;
    buckets.rebuild_offsets();

    data.count
}

/// Find the first pair of opposite facing coplanar buckets of class `flag`.
fn find_cancelling_pair(
    bvh: &Bvh,
    data: &IntersectionData,
    buckets: &Buckets,
    flag: CollisionFlags,
) -> Option<(usize, usize)> {
    for i in 0..buckets.len().saturating_sub(1) {
        let first = buckets.representative(data, i);
        if !first.flags.intersects(flag) {
            continue;
        }
        let first_index = first.bvh_face_index as usize;

        for j in i + 1..buckets.len() {
            let second = buckets.representative(data, j);
            if !second.flags.intersects(flag) {
                continue;
            }
            let second_index = second.bvh_face_index as usize;

            let relation = classify_planes(
                bvh.face(first_index),
                bvh.normal(first_index),
                bvh.face(second_index),
                bvh.normal(second_index),
            );
            if relation == PlaneClassification::ColinearOppositeFacing {
                return Some((i, j));
            }
        }
    }

    None
}

/// Remove bucket pairs that cancel each other, per flag class.
///
/// For each pair, the bucket that is not split by the rest of the set goes.
/// If neither is split, both go. Every round removes at least one bucket,
/// so the loop ends. Returns the remaining number of hits.
pub fn process_buckets(
    bvh: &Bvh,
    data: &mut IntersectionData,
    buckets: &mut Buckets,
    debug: &mut dyn DebugSink,
) -> usize {
    for flag in CANCELLING_CLASSES {
        while let Some((first, second)) = find_cancelling_pair(bvh, data, buckets, flag) {
            if classify_buckets(bvh, data, buckets, flag, first, second) {
                remove_bucket(bvh, data, buckets, second, debug);
            } else if classify_buckets(bvh, data, buckets, flag, second, first) {
                remove_bucket(bvh, data, buckets, first, debug);
            } else {
                // `second > first`, so it shifts down by one
                remove_bucket(bvh, data, buckets, first, debug);
                remove_bucket(bvh, data, buckets, second - 1, debug);
            }
        }
    }

    data.count
}

/// Drop hits whose face the velocity moves away from.
///
/// Returns the remaining number of hits.
pub fn trim_backfacing(bvh: &Bvh, velocity: Vec3, data: &mut IntersectionData) -> usize {
    data.retain(|hit| velocity.dot(bvh.normal(hit.bvh_face_index as usize)) <= EPSILON_LOW)
}

/// Bucket, cancel, then trim back faces. Returns the reduced hit count.
pub fn process_collision_info(
    bvh: &Bvh,
    velocity: Vec3,
    data: &mut IntersectionData,
    debug: &mut dyn DebugSink,
) -> usize {
    if !data.is_empty() {
        let mut buckets = sort_in_buckets(bvh, data);
        process_buckets(bvh, data, &mut buckets, debug);
    }

    trim_backfacing(bvh, velocity, data)
}
