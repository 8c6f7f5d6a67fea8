//! Capsule versus triangle mesh collision.
//!
//! # Key Types
//!
//! - [`Bvh`]: static hierarchy over the world triangles
//! - [`Capsule`]: the swept character volume
//! - [`IntersectionData`]: fixed-capacity buffer of hits for one sweep
//!
//! # Pipeline
//!
//! A sweep goes through three stages:
//! - [`get_time_of_impact`] finds the earliest impact and every face tied with it
//! - [`process_collision_info`] groups the hits into coplanar buckets, cancels
//!   opposite facing pairs and drops back faces
//! - [`get_averaged_normal_filtered`] reduces what is left to one normal per
//!   contact class

mod buckets;
mod bvh;
mod flags;
mod geometry;
mod intersection;
mod normals;
mod toi;

pub use buckets::{
    classify_buckets, process_buckets, process_collision_info, remove_bucket, sort_in_buckets,
    trim_backfacing, Buckets,
};
pub use bvh::{aabb_from_min_max, aabb_min_max, Bvh, BvhBuilder, BvhError, BvhNode, LeafQuery};
pub use flags::{floor_cosine, CollisionFlags, FLOOR_ANGLE_DEGREES};
pub use geometry::{
    classify_capsule_face, classify_planes, classify_point_halfspace, extended_face,
    find_capsule_face_intersection_time, Capsule, CapsuleFaceClassification, CapsuleFaceContact,
    Face, Halfspace, PlaneClassification, EPSILON_LOW, EPSILON_MEDIUM,
};
pub use intersection::{CollisionError, IntersectionData, IntersectionInfo, MAX_INTERSECTIONS};
pub use normals::get_averaged_normal_filtered;
pub use toi::{
    capsule_aabb, ensure_in_valid_space, get_time_of_impact, is_in_valid_space,
    swept_capsule_aabb, AABB_MULTIPLIER,
};
