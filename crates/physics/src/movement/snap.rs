//! Floor snapping and step climbing.
//!
//! Both work the same way: lift the capsule by its radius, sweep it down by
//! a bit more than its diameter and look for the first floor it lands on.

use glam::Vec3;

use super::config::MovementConfig;
use crate::collision::{
    classify_capsule_face, extended_face, find_capsule_face_intersection_time,
    get_time_of_impact, is_in_valid_space, Bvh, Capsule, CollisionError, CollisionFlags,
    IntersectionData, IntersectionInfo,
};
use crate::debug::{DebugColor, DebugSink};

/// A floor the capsule can be placed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The floor hit. `time` is measured against the extended face.
    pub info: IntersectionInfo,
    /// Center height of the capsule resting on the floor.
    pub resting_y: f32,
}

/// Look for a floor under the capsule within one diameter.
///
/// The capsule is raised by its radius and swept straight down. The first
/// hit must be a pure floor. The impact is then recomputed against that face
/// grown by one diameter, so a capsule hanging over the edge of a floor
/// still lands on its plane. The capsule must start clear of the grown face
/// and end in valid space.
///
/// # Returns
///
/// `None` when there is no floor to snap to.
pub fn can_snap_vertically(
    bvh: &Bvh,
    capsule: &Capsule,
    config: &MovementConfig,
    debug: &mut dyn DebugSink,
) -> Result<Option<SnapResult>, CollisionError> {
    let radius = capsule.radius;
    let mut probe = capsule.translated(Vec3::new(0.0, radius, 0.0));
    let displacement = Vec3::new(0.0, -config.snap_distance(radius), 0.0);

    let mut hits = IntersectionData::new();
    get_time_of_impact(
        bvh,
        &probe,
        displacement,
        &mut hits,
        config.toi_iterations,
        config.toi_limit_distance,
        debug,
    )?;

    let Some(floor) = hits.first_floor() else {
        return Ok(None);
    };

    let index = floor.bvh_face_index as usize;
    let normal = bvh.normal(index);
    let extended = extended_face(bvh.face(index), radius * 2.0);

    if classify_capsule_face(&probe, &extended, normal).collides() {
        return Ok(None);
    }

    let time = find_capsule_face_intersection_time(
        &probe,
        &extended,
        normal,
        displacement,
        config.toi_iterations,
        config.toi_limit_distance,
    );
    probe.center.y += displacement.y * time;

    if !is_in_valid_space(bvh, &probe)? {
        return Ok(None);
    }

    Ok(Some(SnapResult {
        info: IntersectionInfo { time, ..floor },
        resting_y: probe.center.y,
    }))
}

/// Check whether a blocked move can continue on top of a low obstacle.
///
/// Only applies when a wall was hit. The capsule is pushed forward by the
/// step probe distance; that position must be blocked, otherwise there is
/// nothing to climb. The pushed capsule must then find a floor to snap to,
/// and the capsule at its current position raised to that height must be in
/// valid space.
pub fn can_step_up(
    bvh: &Bvh,
    hits: &IntersectionData,
    capsule: &Capsule,
    direction: Vec3,
    config: &MovementConfig,
    debug: &mut dyn DebugSink,
) -> Result<Option<SnapResult>, CollisionError> {
    let hit_wall = hits
        .as_slice()
        .iter()
        .any(|hit| bvh.flags(hit.bvh_face_index as usize) == CollisionFlags::WALLS);
    if !hit_wall {
        return Ok(None);
    }

    let shifted = capsule.translated(direction * config.snap_shift);
    if is_in_valid_space(bvh, &shifted)? {
        return Ok(None);
    }

    let Some(snap) = can_snap_vertically(bvh, &shifted, config, debug)? else {
        return Ok(None);
    };

    let mut raised = *capsule;
    raised.center.y = snap.resting_y;
    if !is_in_valid_space(bvh, &raised)? {
        return Ok(None);
    }

    Ok(Some(snap))
}

/// Status line and landing face for a vertical snap.
pub(crate) fn record_snap(bvh: &Bvh, snap: &SnapResult, distance: f32, debug: &mut dyn DebugSink) {
    if !debug.flags().draw_status {
        return;
    }

    let index = snap.info.bvh_face_index as usize;
    debug.record_text(&format!("SNAPPING {distance}"), DebugColor::GREEN, 400.0, 300.0);
    debug.record_face(bvh.face(index), bvh.normal(index), DebugColor::for_flags(bvh.flags(index)), 1);
}

/// Status line and landing face for a step-up.
pub(crate) fn record_step_up(bvh: &Bvh, snap: &SnapResult, delta: f32, debug: &mut dyn DebugSink) {
    let flags = *debug.flags();
    let index = snap.info.bvh_face_index as usize;

    if flags.draw_status {
        debug.record_text(&format!("STEPUP {delta}"), DebugColor::RED, 400.0, 320.0);
    }

    if flags.draw_step_up {
        let width = if bvh.is_floor(index) { 3 } else { 2 };
        debug.record_face(bvh.face(index), bvh.normal(index), DebugColor::for_flags(bvh.flags(index)), width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::BvhBuilder;
    use crate::debug::NullDebugSink;

    fn floor(builder: &mut BvhBuilder) {
        builder.add_quad(
            Vec3::new(-1000.0, 0.0, 1000.0),
            Vec3::new(1000.0, 0.0, 1000.0),
            Vec3::new(1000.0, 0.0, -1000.0),
            Vec3::new(-1000.0, 0.0, -1000.0),
        );
    }

    /// Floor plus a ledge of `height` whose front wall is the plane x = 50.
    fn ledge(height: f32) -> Bvh {
        let mut builder = BvhBuilder::new();
        floor(&mut builder);
        // Top, facing +Y
        builder.add_quad(
            Vec3::new(50.0, height, 100.0),
            Vec3::new(150.0, height, 100.0),
            Vec3::new(150.0, height, -100.0),
            Vec3::new(50.0, height, -100.0),
        );
        // Front, facing -X
        builder.add_quad(
            Vec3::new(50.0, 0.0, -100.0),
            Vec3::new(50.0, 0.0, 100.0),
            Vec3::new(50.0, height, 100.0),
            Vec3::new(50.0, height, -100.0),
        );
        builder.build().unwrap()
    }

    fn wall_hits(bvh: &Bvh) -> IntersectionData {
        let mut hits = IntersectionData::new();
        for i in 0..bvh.face_count() {
            if bvh.flags(i) == CollisionFlags::WALLS {
                hits.push(IntersectionInfo::new(0.5, CollisionFlags::WALLS, i as u32)).unwrap();
            }
        }
        hits
    }

    #[test]
    fn test_snap_is_stable_on_flat_floor() {
        let mut builder = BvhBuilder::new();
        floor(&mut builder);
        let bvh = builder.build().unwrap();
        let config = MovementConfig::default();
        let capsule = config.capsule_at(Vec3::new(0.0, 28.0, 0.0));

        let first = can_snap_vertically(&bvh, &capsule, &config, &mut NullDebugSink::new())
            .unwrap()
            .expect("floor below");
        let second = can_snap_vertically(&bvh, &capsule, &config, &mut NullDebugSink::new())
            .unwrap()
            .expect("floor below");

        assert_eq!(first, second);
        assert!(first.info.flags == CollisionFlags::FLOOR);
        assert!(first.resting_y > 27.999 && first.resting_y < 28.01, "y = {}", first.resting_y);
    }

    #[test]
    fn test_snap_from_slightly_above() {
        let mut builder = BvhBuilder::new();
        floor(&mut builder);
        let bvh = builder.build().unwrap();
        let config = MovementConfig::default();

        let capsule = config.capsule_at(Vec3::new(3.0, 40.0, -7.0));
        let snap = can_snap_vertically(&bvh, &capsule, &config, &mut NullDebugSink::new())
            .unwrap()
            .expect("floor within reach");
        assert!((snap.resting_y - 28.0).abs() < 0.01);

        // Out of reach
        let capsule = config.capsule_at(Vec3::new(0.0, 80.0, 0.0));
        let snap = can_snap_vertically(&bvh, &capsule, &config, &mut NullDebugSink::new()).unwrap();
        assert!(snap.is_none());
    }

    #[test]
    fn test_no_snap_without_floor() {
        let mut builder = BvhBuilder::new();
        // Wall only
        builder.add_quad(
            Vec3::new(20.0, -100.0, -100.0),
            Vec3::new(20.0, -100.0, 100.0),
            Vec3::new(20.0, 100.0, 100.0),
            Vec3::new(20.0, 100.0, -100.0),
        );
        let bvh = builder.build().unwrap();
        let config = MovementConfig::default();
        let capsule = config.capsule_at(Vec3::new(0.0, 28.0, 0.0));

        let snap = can_snap_vertically(&bvh, &capsule, &config, &mut NullDebugSink::new()).unwrap();
        assert!(snap.is_none());
    }

    #[test]
    fn test_step_up_low_ledge() {
        let bvh = ledge(10.0);
        let config = MovementConfig::default();
        // Resting on the floor, a quarter unit from the ledge front
        let capsule = config.capsule_at(Vec3::new(33.75, 28.0, 0.0));
        assert!(is_in_valid_space(&bvh, &capsule).unwrap());

        let step = can_step_up(
            &bvh,
            &wall_hits(&bvh),
            &capsule,
            Vec3::X,
            &config,
            &mut NullDebugSink::new(),
        )
        .unwrap()
        .expect("ledge is climbable");

        assert!((step.resting_y - 38.0).abs() < 0.05, "y = {}", step.resting_y);
        assert_eq!(step.info.flags, CollisionFlags::FLOOR);
    }

    #[test]
    fn test_step_up_rejects_high_ledge() {
        let bvh = ledge(30.0);
        let config = MovementConfig::default();
        let capsule = config.capsule_at(Vec3::new(33.75, 28.0, 0.0));

        let step = can_step_up(
            &bvh,
            &wall_hits(&bvh),
            &capsule,
            Vec3::X,
            &config,
            &mut NullDebugSink::new(),
        )
        .unwrap();
        assert!(step.is_none());
    }

    #[test]
    fn test_step_up_needs_a_wall() {
        let bvh = ledge(10.0);
        let config = MovementConfig::default();
        let capsule = config.capsule_at(Vec3::new(33.75, 28.0, 0.0));

        let step = can_step_up(
            &bvh,
            &IntersectionData::new(),
            &capsule,
            Vec3::X,
            &config,
            &mut NullDebugSink::new(),
        )
        .unwrap();
        assert!(step.is_none());
    }

    #[test]
    fn test_step_up_needs_blocked_probe() {
        let bvh = ledge(10.0);
        let config = MovementConfig::default();
        // Far from the ledge, pushing forward stays free
        let capsule = config.capsule_at(Vec3::new(-100.0, 28.0, 0.0));

        let step = can_step_up(
            &bvh,
            &wall_hits(&bvh),
            &capsule,
            Vec3::X,
            &config,
            &mut NullDebugSink::new(),
        )
        .unwrap();
        assert!(step.is_none());
    }
}
