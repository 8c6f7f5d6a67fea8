//! Time of impact between a swept capsule and the world.

use glam::Vec3;
use parry3d::bounding_volume::{Aabb, BoundingVolume};

use super::bvh::{aabb_from_min_max, Bvh};
use super::geometry::{
    classify_capsule_face, find_capsule_face_intersection_time, Capsule, EPSILON_LOW,
    EPSILON_MEDIUM,
};
use super::intersection::{CollisionError, IntersectionData, IntersectionInfo};
use crate::debug::{DebugColor, DebugSink};

/// Growth applied to query boxes to absorb numerical slop.
pub const AABB_MULTIPLIER: f32 = 1.025;

/// Bounds of a capsule, scaled about its center.
pub fn capsule_aabb(capsule: &Capsule, multiplier: f32) -> Aabb {
    let half = capsule.half_extents() * multiplier;
    aabb_from_min_max(capsule.center - half, capsule.center + half)
}

/// Bounds covering a capsule at the start and the end of `displacement`.
pub fn swept_capsule_aabb(capsule: &Capsule, displacement: Vec3, multiplier: f32) -> Aabb {
    capsule_aabb(capsule, multiplier).merged(&capsule_aabb(
        &capsule.translated(displacement),
        multiplier,
    ))
}

/// True when the capsule does not meaningfully overlap any face.
///
/// Overlaps with a penetration below the low precision epsilon are tolerated.
pub fn is_in_valid_space(bvh: &Bvh, capsule: &Capsule) -> Result<bool, CollisionError> {
    let bounds = capsule_aabb(capsule, AABB_MULTIPLIER);
    let leaves = bvh.query(&bounds)?;

    for i in bvh.candidates(&leaves, &bounds) {
        let contact = classify_capsule_face(capsule, bvh.face(i), bvh.normal(i));
        if contact.collides() && contact.penetration.length_squared() > EPSILON_LOW {
            return Ok(false);
        }
    }

    Ok(true)
}

/// Push the capsule out of every face it overlaps, in a single pass.
///
/// Penetrations are applied one after the other, so later faces see the
/// already corrected position.
pub fn ensure_in_valid_space(bvh: &Bvh, capsule: &mut Capsule) -> Result<(), CollisionError> {
    let bounds = capsule_aabb(capsule, AABB_MULTIPLIER);
    let leaves = bvh.query(&bounds)?;

    for i in bvh.candidates(&leaves, &bounds) {
        let contact = classify_capsule_face(capsule, bvh.face(i), bvh.normal(i));
        if contact.collides() {
            capsule.center += contact.penetration;
        }
    }

    Ok(())
}

/// Find the earliest impact along `displacement` and every face hit at it.
///
/// Faces the capsule would not overlap after the full displacement are
/// skipped. Faces behind the capsule are kept; bucket processing deals with
/// them. Times within [`EPSILON_MEDIUM`] of the minimum are ties and all of
/// them are reported.
///
/// # Arguments
///
/// * `out` - Cleared, then filled with the tied hits; `out.hits[0].time`
///   stays at `1.0` when nothing is hit
/// * `iterations` - Bisection cap per face
/// * `limit_distance` - Bisection stops once the bracket is this short
///
/// # Returns
///
/// The number of hits, or an error if more than the buffer capacity tie.
pub fn get_time_of_impact(
    bvh: &Bvh,
    capsule: &Capsule,
    displacement: Vec3,
    out: &mut IntersectionData,
    iterations: u32,
    limit_distance: f32,
    debug: &mut dyn DebugSink,
) -> Result<usize, CollisionError> {
    out.clear();

    let bounds = swept_capsule_aabb(capsule, displacement, AABB_MULTIPLIER);
    let leaves = bvh.query(&bounds)?;

    if debug.flags().draw_collision_query {
        for i in bvh.leaf_faces(&leaves) {
            let width = if bvh.is_floor(i) { 3 } else { 2 };
            debug.record_face(bvh.face(i), bvh.normal(i), DebugColor::for_flags(bvh.flags(i)), width);
        }
    }

    let moved = capsule.translated(displacement);
    let mut min_time = IntersectionInfo::NONE.time;

    for i in bvh.candidates(&leaves, &bounds) {
        let face = bvh.face(i);
        let normal = bvh.normal(i);

        // Faces not overlapped at the end of the move cannot stop it
        if !classify_capsule_face(&moved, face, normal).collides() {
            continue;
        }

        let time = find_capsule_face_intersection_time(
            capsule,
            face,
            normal,
            displacement,
            iterations,
            limit_distance,
        );

        if time < min_time - EPSILON_MEDIUM {
            out.count = 0;
        } else if time > min_time + EPSILON_MEDIUM {
            continue;
        }

        min_time = min_time.min(time);
        out.push(IntersectionInfo::new(time, bvh.flags(i), i as u32))?;
    }

    if out.count > 1 {
        out.retain(|hit| hit.time <= min_time + EPSILON_MEDIUM);
        if let Some(first) = out.as_slice().iter().position(|hit| hit.time == min_time) {
            out.hits.swap(0, first);
        }
    }

    Ok(out.count)
}
