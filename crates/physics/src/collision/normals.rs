//! One representative contact normal per flag class.

use glam::Vec3;

use super::buckets::sort_in_buckets;
use super::bvh::Bvh;
use super::flags::CollisionFlags;
use super::geometry::EPSILON_LOW;
use super::intersection::IntersectionData;
use crate::debug::{DebugColor, DebugSink};

/// Average the normals of the buckets matching `flag_mask`.
///
/// Each bucket contributes a single normal, so a surface sampled by many
/// triangles weighs as much as one sampled by a single triangle. The hits
/// are re-sorted into buckets in place.
///
/// When `adjust_non_walkable` is set, the mask excludes floors and the
/// player stands on solid ground, the result is turned into a vertical wall
/// normal. A result pointing straight up or down is instead made
/// perpendicular to `orientation`.
///
/// # Returns
///
/// The union of the matched flags, or [`CollisionFlags::NONE`] when nothing
/// matched or the normals cancel out. `out_normal` is only meaningful in the
/// first case.
#[allow(clippy::too_many_arguments)]
pub fn get_averaged_normal_filtered(
    orientation: Vec3,
    bvh: &Bvh,
    out_normal: &mut Vec3,
    data: &mut IntersectionData,
    on_solid_floor: bool,
    flag_mask: CollisionFlags,
    adjust_non_walkable: bool,
    debug: &mut dyn DebugSink,
) -> CollisionFlags {
    debug_assert!(!flag_mask.is_empty() && !flag_mask.is_none());

    let mut flags = CollisionFlags::EMPTY;
    let mut sum = Vec3::ZERO;
    let buckets = sort_in_buckets(bvh, data);

    for bucket in 0..buckets.len() {
        let range = buckets.range(bucket);
        let first = data.hits[range.start];
        if !first.flags.intersects(flag_mask) {
            continue;
        }

        sum += bvh.normal(first.bvh_face_index as usize);
        flags |= first.flags;

        if debug.flags().draw_collided_face {
            for hit in &data.hits[range] {
                let i = hit.bvh_face_index as usize;
                debug.record_face(bvh.face(i), bvh.normal(i), DebugColor::for_flags(bvh.flags(i)), 2);
            }
        }
    }

    if sum.length_squared() <= EPSILON_LOW {
        *out_normal = Vec3::ZERO;
        return CollisionFlags::NONE;
    }

    let mut normal = sum.normalize();

    if on_solid_floor && adjust_non_walkable && !flag_mask.intersects(CollisionFlags::FLOOR) {
        if (Vec3::Y.dot(normal).abs() - 1.0).abs() <= EPSILON_LOW {
            normal = normal.cross(orientation).normalize_or_zero();
        } else {
            let perp = Vec3::Y.cross(normal).normalize();
            normal = perp.cross(Vec3::Y).normalize();
        }
    }

    *out_normal = normal;
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::bvh::BvhBuilder;
    use crate::collision::intersection::IntersectionInfo;
    use crate::debug::NullDebugSink;

    fn all_hits(bvh: &Bvh) -> IntersectionData {
        let mut data = IntersectionData::new();
        for i in 0..bvh.face_count() {
            data.push(IntersectionInfo::new(0.0, bvh.flags(i), i as u32)).unwrap();
        }
        data
    }

    #[test]
    fn test_coplanar_floor_counts_once() {
        let mut builder = BvhBuilder::new();
        builder.add_quad(
            Vec3::new(-10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, -10.0),
            Vec3::new(-10.0, 0.0, -10.0),
        );
        // A 45 degree ramp next to it
        builder.add_triangle(
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(20.0, 10.0, 10.0),
            Vec3::new(10.0, 0.0, -10.0),
        );
        let bvh = builder.build().unwrap();
        let mut data = all_hits(&bvh);
        let mut normal = Vec3::ZERO;

        let flags = get_averaged_normal_filtered(
            Vec3::X,
            &bvh,
            &mut normal,
            &mut data,
            false,
            CollisionFlags::FLOOR,
            false,
            &mut NullDebugSink::new(),
        );

        assert_eq!(flags, CollisionFlags::FLOOR);
        let ramp = Vec3::new(-1.0, 1.0, 0.0).normalize();
        let expected = (Vec3::Y + ramp).normalize();
        assert!((normal - expected).length() < 1e-4, "normal = {normal}");
    }

    #[test]
    fn test_no_match_returns_none() {
        let mut builder = BvhBuilder::new();
        builder.add_triangle(
            Vec3::new(-10.0, 0.0, 10.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, -10.0),
        );
        let bvh = builder.build().unwrap();
        let mut data = all_hits(&bvh);
        let mut normal = Vec3::ONE;

        let flags = get_averaged_normal_filtered(
            Vec3::X,
            &bvh,
            &mut normal,
            &mut data,
            true,
            CollisionFlags::WALLS | CollisionFlags::CEILING,
            true,
            &mut NullDebugSink::new(),
        );

        assert_eq!(flags, CollisionFlags::NONE);
    }

    #[test]
    fn test_steep_slope_becomes_vertical_wall() {
        let mut builder = BvhBuilder::new();
        // 70 degree slope facing -X
        let run = 70f32.to_radians().cos() * 10.0;
        let rise = 70f32.to_radians().sin() * 10.0;
        builder.add_triangle(
            Vec3::new(0.0, 0.0, -10.0),
            Vec3::new(0.0, 0.0, 10.0),
            Vec3::new(run, rise, 0.0),
        );
        let bvh = builder.build().unwrap();
        assert_eq!(bvh.flags(0), CollisionFlags::WALLS);

        let mask = CollisionFlags::WALLS | CollisionFlags::CEILING;
        let mut normal = Vec3::ZERO;

        let flags = get_averaged_normal_filtered(
            Vec3::X,
            &bvh,
            &mut normal,
            &mut all_hits(&bvh),
            true,
            mask,
            true,
            &mut NullDebugSink::new(),
        );
        assert_eq!(flags, CollisionFlags::WALLS);
        assert!((normal - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-4, "normal = {normal}");

        // Airborne, the slope keeps its real normal
        let flags = get_averaged_normal_filtered(
            Vec3::X,
            &bvh,
            &mut normal,
            &mut all_hits(&bvh),
            false,
            mask,
            true,
            &mut NullDebugSink::new(),
        );
        assert_eq!(flags, CollisionFlags::WALLS);
        assert!(normal.y > 0.3);
    }

    #[test]
    fn test_flat_ceiling_turns_against_orientation() {
        let mut builder = BvhBuilder::new();
        builder.add_triangle(
            Vec3::new(-10.0, 50.0, 10.0),
            Vec3::new(0.0, 50.0, -10.0),
            Vec3::new(10.0, 50.0, 10.0),
        );
        let bvh = builder.build().unwrap();
        assert_eq!(bvh.flags(0), CollisionFlags::CEILING);

        let mut normal = Vec3::ZERO;
        let flags = get_averaged_normal_filtered(
            Vec3::X,
            &bvh,
            &mut normal,
            &mut all_hits(&bvh),
            true,
            CollisionFlags::WALLS | CollisionFlags::CEILING,
            true,
            &mut NullDebugSink::new(),
        );

        assert_eq!(flags, CollisionFlags::CEILING);
        assert!((normal - Vec3::Z).length() < 1e-4, "normal = {normal}");
    }
}
