//! Level geometry and spawn points.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use slidecap_physics::{Bvh, BvhBuilder, BvhError};

/// A game level: a static BVH plus where the player may start.
#[derive(Debug)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Collision geometry.
    pub bvh: Bvh,

    /// Player spawn points.
    pub spawn_points: Vec<SpawnPoint>,
}

/// A player start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Capsule center in world space.
    pub position: Vec3,

    /// Rotation about +Y from the default -Z facing, in radians.
    pub facing: f32,
}

impl SpawnPoint {
    pub fn new(position: Vec3, facing: f32) -> Self {
        Self { position, facing }
    }
}

impl Level {
    /// Build a level from collected geometry.
    pub fn new(
        id: &str,
        name: &str,
        builder: &BvhBuilder,
        spawn_points: Vec<SpawnPoint>,
    ) -> Result<Self, BvhError> {
        let bvh = builder.build()?;
        log::info!(
            "Level '{}' built: {} faces, {} nodes",
            id,
            bvh.face_count(),
            bvh.nodes().len()
        );

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            bvh,
            spawn_points,
        })
    }

    /// Build a level from an indexed triangle list.
    pub fn from_mesh(
        id: &str,
        name: &str,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
        spawn_points: Vec<SpawnPoint>,
    ) -> Result<Self, BvhError> {
        let mut builder = BvhBuilder::new();
        builder.add_triangle_mesh(vertices, indices)?;
        Self::new(id, name, &builder, spawn_points)
    }

    /// Walled arena with a pillar, a low step, a ramp and a low canopy.
    pub fn test_arena() -> Result<Self, BvhError> {
        let size = 500.0;
        let wall_height = 200.0;
        let mut builder = BvhBuilder::new();

        // Floor
        builder.add_quad(
            Vec3::new(-size, 0.0, size),
            Vec3::new(size, 0.0, size),
            Vec3::new(size, 0.0, -size),
            Vec3::new(-size, 0.0, -size),
        );

        // Walls, facing inward
        builder.add_quad(
            Vec3::new(-size, 0.0, -size),
            Vec3::new(size, 0.0, -size),
            Vec3::new(size, wall_height, -size),
            Vec3::new(-size, wall_height, -size),
        );
        builder.add_quad(
            Vec3::new(size, 0.0, size),
            Vec3::new(-size, 0.0, size),
            Vec3::new(-size, wall_height, size),
            Vec3::new(size, wall_height, size),
        );
        builder.add_quad(
            Vec3::new(size, 0.0, -size),
            Vec3::new(size, 0.0, size),
            Vec3::new(size, wall_height, size),
            Vec3::new(size, wall_height, -size),
        );
        builder.add_quad(
            Vec3::new(-size, 0.0, size),
            Vec3::new(-size, 0.0, -size),
            Vec3::new(-size, wall_height, -size),
            Vec3::new(-size, wall_height, size),
        );

        // Central pillar
        builder.add_box(Vec3::new(0.0, 50.0, -200.0), Vec3::new(40.0, 50.0, 40.0));

        // Step, low enough to climb
        builder.add_box(Vec3::new(200.0, 5.0, 0.0), Vec3::new(50.0, 5.0, 50.0));

        // 30 degree ramp rising toward -X
        let rise = 150.0 * 30f32.to_radians().tan();
        builder.add_quad(
            Vec3::new(-250.0, 0.0, 100.0),
            Vec3::new(-250.0, 0.0, -100.0),
            Vec3::new(-400.0, rise, -100.0),
            Vec3::new(-400.0, rise, 100.0),
        );

        // Canopy low enough to bump into when jumping
        builder.add_box(Vec3::new(-200.0, 75.0, 300.0), Vec3::new(60.0, 5.0, 60.0));

        Self::new(
            "test_arena",
            "Test Arena",
            &builder,
            vec![
                SpawnPoint::new(Vec3::new(0.0, 40.0, 200.0), 0.0),
                SpawnPoint::new(Vec3::new(-200.0, 40.0, 0.0), std::f32::consts::FRAC_PI_2),
            ],
        )
    }

    /// Floor with two walls meeting at a right angle, for corner tests.
    pub fn corner() -> Result<Self, BvhError> {
        let mut builder = BvhBuilder::new();
        builder.add_quad(
            Vec3::new(-200.0, 0.0, 200.0),
            Vec3::new(200.0, 0.0, 200.0),
            Vec3::new(200.0, 0.0, -200.0),
            Vec3::new(-200.0, 0.0, -200.0),
        );
        // Facing -X at x = 100
        builder.add_quad(
            Vec3::new(100.0, 0.0, -200.0),
            Vec3::new(100.0, 0.0, 200.0),
            Vec3::new(100.0, 200.0, 200.0),
            Vec3::new(100.0, 200.0, -200.0),
        );
        // Facing +Z at z = -100
        builder.add_quad(
            Vec3::new(-200.0, 0.0, -100.0),
            Vec3::new(200.0, 0.0, -100.0),
            Vec3::new(200.0, 200.0, -100.0),
            Vec3::new(-200.0, 200.0, -100.0),
        );

        Self::new(
            "corner",
            "Corner",
            &builder,
            vec![SpawnPoint::new(Vec3::new(0.0, 28.5, 0.0), 0.0)],
        )
    }

    /// Get a player spawn point.
    pub fn get_player_spawn(&self, index: usize) -> Option<&SpawnPoint> {
        self.spawn_points.get(index)
    }

    /// Get the number of player spawn points.
    pub fn player_spawn_count(&self) -> usize {
        self.spawn_points.len()
    }
}
