//! Slide move algorithm for collision response.
//!
//! A frame's displacement is spent in a few sub-steps. Each sub-step sweeps
//! the capsule until the earliest impact, then either climbs a step or
//! projects what is left of the motion onto the contact plane.

use glam::Vec3;

use crate::collision::{
    get_averaged_normal_filtered, get_time_of_impact, is_in_valid_space, process_collision_info,
    Bvh, Capsule, CollisionError, CollisionFlags, IntersectionData, EPSILON_LOW,
};
use crate::debug::{DebugColor, DebugSink};

use super::config::MovementConfig;
use super::snap::{can_step_up, record_step_up};

/// Contact classes resolved each sub-step, in order.
///
/// Floors keep their real normal. Walls and ceilings may be straightened
/// into vertical walls while grounded.
const CONTACT_PASSES: [(CollisionFlags, bool, DebugColor); 2] = [
    (CollisionFlags::FLOOR, false, DebugColor::GREEN),
    (
        CollisionFlags(CollisionFlags::WALLS.0 | CollisionFlags::CEILING.0),
        true,
        DebugColor::RED,
    ),
];

/// Outcome of one frame of collision resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionReport {
    /// Union of the contact classes the motion was projected against.
    pub flags: CollisionFlags,
    /// Length of the requested displacement.
    pub initial_energy: f32,
    /// Motion left when resolution stopped.
    pub remaining_energy: f32,
    /// Sub-steps used.
    pub steps: u32,
    pub stepped_up: bool,
}

/// Project the motion onto the plane of `normal`.
///
/// The direction is slid along the plane, then scaled by how much it still
/// agrees with the original `orientation`; motion that would turn back
/// against the intent is dropped.
///
/// # Returns
///
/// The energy left, which is also the new length of `velocity`.
pub fn project_velocity(orientation: Vec3, normal: Vec3, energy: f32, velocity: &mut Vec3) -> f32 {
    debug_assert!(velocity.length_squared() > EPSILON_LOW, "projecting a zero velocity");

    let direction = velocity.normalize_or_zero();
    let slid = direction - normal * direction.dot(normal);
    if slid.length_squared() <= EPSILON_LOW {
        *velocity = Vec3::ZERO;
        return 0.0;
    }

    let slid = slid.normalize();
    let applied = energy * orientation.dot(slid).max(0.0);
    *velocity = slid * applied;
    applied
}

/// Move the capsule by `displacement`, sliding along what it hits.
///
/// Stops after the configured number of sub-steps, when the motion is spent,
/// or when the remaining energy drops under the cutoff. A sub-step with no
/// hit applies the rest of the motion at once; if that lands the capsule in
/// invalid space the move is undone.
///
/// # Arguments
///
/// * `on_solid_floor` - Grounded players treat steep surfaces as vertical walls
///
/// # Returns
///
/// A report of the contacts met and energy spent.
pub fn handle_collision_detection(
    bvh: &Bvh,
    capsule: &mut Capsule,
    on_solid_floor: bool,
    displacement: Vec3,
    config: &MovementConfig,
    debug: &mut dyn DebugSink,
) -> Result<ResolutionReport, CollisionError> {
    let orientation = displacement.normalize_or_zero();
    let mut velocity = displacement;
    let mut energy = displacement.length();
    let mut report = ResolutionReport {
        flags: CollisionFlags::EMPTY,
        initial_energy: energy,
        remaining_energy: energy,
        steps: 0,
        stepped_up: false,
    };
    let mut hits = IntersectionData::new();

    while report.steps < config.resolution_steps && velocity.length_squared() > EPSILON_LOW {
        report.steps += 1;

        get_time_of_impact(
            bvh,
            capsule,
            velocity,
            &mut hits,
            config.toi_iterations,
            config.toi_limit_distance,
            debug,
        )?;
        process_collision_info(bvh, velocity, &mut hits, debug);

        if hits.is_empty() {
            let previous = capsule.center;
            capsule.center += velocity;

            if !is_in_valid_space(bvh, capsule)? {
                capsule.center = previous;
                report_invalid_space(capsule, debug);
            } else {
                energy = 0.0;
            }

            report.remaining_energy = energy;
            return Ok(report);
        }

        let length = velocity.length();
        let direction = velocity / length;
        let toi = hits.time_of_impact();

        // Stop short of the surface by the cutoff distance
        capsule.center += direction * (toi * length - config.energy_cutoff).max(0.0);
        energy *= 1.0 - toi;

        if let Some(step) = can_step_up(bvh, &hits, capsule, direction, config, debug)? {
            let delta = step.resting_y - capsule.center.y;
            log::trace!("Stepping up {delta} onto face {}", step.info.bvh_face_index);
            record_step_up(bvh, &step, delta, debug);

            capsule.center.y = step.resting_y;
            report.stepped_up = true;
            continue;
        }

        for (pass, (mask, adjust, color)) in CONTACT_PASSES.into_iter().enumerate() {
            let mut normal = Vec3::ZERO;
            let flags = get_averaged_normal_filtered(
                direction,
                bvh,
                &mut normal,
                &mut hits,
                on_solid_floor,
                mask,
                adjust,
                debug,
            );
            if flags.is_none() {
                continue;
            }

            report.flags |= flags;
            energy = project_velocity(orientation, normal, energy, &mut velocity);

            if energy <= 0.0 || energy < config.energy_cutoff {
                report.remaining_energy = energy;
                return Ok(report);
            }

            let y = 330.0 + (report.steps as f32 - 1.0) * 20.0 + pass as f32 * 20.0;
            debug.record_text(
                &format!("NORMAL {:.3} {:.3} {:.3}", normal.x, normal.y, normal.z),
                color,
                0.0,
                y,
            );
        }
    }

    report.remaining_energy = energy;
    Ok(report)
}

/// Flag a capsule left overlapping the world.
pub(crate) fn report_invalid_space(capsule: &Capsule, debug: &mut dyn DebugSink) {
    log::warn!("Capsule at {} is not in valid space", capsule.center);
    debug.record_text("NOT IN VALID SPACE", DebugColor::RED, 200.0, 20.0);
}
