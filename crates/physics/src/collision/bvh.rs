//! Static bounding volume hierarchy over the world triangles.
//!
//! The tree is built once from level geometry and is read-only afterwards,
//! so it can be shared freely between queries. Faces, normals and per-face
//! bounds live in flat parallel arrays; leaves reference contiguous ranges
//! of those arrays.

use glam::Vec3;
use parry3d::bounding_volume::{Aabb, BoundingVolume};
use thiserror::Error;

use super::flags::CollisionFlags;
use super::geometry::{from_point, to_point, Face};
use super::intersection::{CollisionError, MAX_INTERSECTIONS};

/// Faces per leaf the builder aims for.
pub const DEFAULT_MAX_LEAF_SIZE: usize = 4;

const TRAVERSAL_STACK_SIZE: usize = 64;

/// Errors raised while building a [`Bvh`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BvhError {
    #[error("cannot build a hierarchy without geometry")]
    Empty,

    #[error("triangle {index} is degenerate")]
    DegenerateTriangle { index: usize },

    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
}

/// Build an [`Aabb`] from glam corners.
#[inline]
pub fn aabb_from_min_max(min: Vec3, max: Vec3) -> Aabb {
    Aabb::new(to_point(min), to_point(max))
}

/// Node of the hierarchy.
///
/// A leaf has `tri_count > 0` and covers faces
/// `[left_first, left_first + tri_count)`. An internal node has
/// `tri_count == 0` and its children are `left_first` and `left_first + 1`.
#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left_first: u32,
    pub tri_count: u32,
}

impl BvhNode {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.tri_count > 0
    }

    /// Face indices covered by a leaf.
    #[inline]
    pub fn face_range(&self) -> std::ops::Range<usize> {
        let first = self.left_first as usize;
        first..first + self.tri_count as usize
    }
}

/// Leaf nodes overlapping a query box, stored without allocation.
#[derive(Debug, Clone)]
pub struct LeafQuery {
    nodes: [u32; MAX_INTERSECTIONS],
    count: usize,
}

impl LeafQuery {
    fn new() -> Self {
        Self {
            nodes: [0; MAX_INTERSECTIONS],
            count: 0,
        }
    }

    fn push(&mut self, node: u32) -> Result<(), CollisionError> {
        if self.count >= MAX_INTERSECTIONS {
            return Err(CollisionError::CapacityExceeded {
                capacity: MAX_INTERSECTIONS,
            });
        }
        self.nodes[self.count] = node;
        self.count += 1;
        Ok(())
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.nodes[..self.count]
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The static hierarchy.
#[derive(Debug, Clone)]
pub struct Bvh {
    faces: Vec<Face>,
    normals: Vec<Vec3>,
    bounds: Vec<Aabb>,
    nodes: Vec<BvhNode>,
}

impl Bvh {
    #[inline]
    pub fn face(&self, index: usize) -> &Face {
        &self.faces[index]
    }

    #[inline]
    pub fn normal(&self, index: usize) -> Vec3 {
        self.normals[index]
    }

    #[inline]
    pub fn face_bounds(&self, index: usize) -> &Aabb {
        &self.bounds[index]
    }

    /// Contact class of a face.
    #[inline]
    pub fn flags(&self, index: usize) -> CollisionFlags {
        CollisionFlags::from_normal(self.normals[index])
    }

    #[inline]
    pub fn is_floor(&self, index: usize) -> bool {
        self.flags(index) == CollisionFlags::FLOOR
    }

    pub fn faces(&self) -> &[Face] {
        &self.faces
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn nodes(&self) -> &[BvhNode] {
        &self.nodes
    }

    /// Bounds of the whole level.
    pub fn root_bounds(&self) -> &Aabb {
        &self.nodes[0].bounds
    }

    /// Collect the leaves whose bounds overlap `bounds`.
    ///
    /// Fails if more than [`MAX_INTERSECTIONS`] leaves overlap.
    pub fn query(&self, bounds: &Aabb) -> Result<LeafQuery, CollisionError> {
        let mut result = LeafQuery::new();
        let mut stack = [0u32; TRAVERSAL_STACK_SIZE];
        let mut depth = 1;

        while depth > 0 {
            depth -= 1;
            let node = &self.nodes[stack[depth] as usize];
            if !node.bounds.intersects(bounds) {
                continue;
            }

            if node.is_leaf() {
                result.push(stack[depth])?;
                continue;
            }

            if depth + 2 > TRAVERSAL_STACK_SIZE {
                return Err(CollisionError::CapacityExceeded {
                    capacity: TRAVERSAL_STACK_SIZE,
                });
            }
            stack[depth] = node.left_first + 1;
            stack[depth + 1] = node.left_first;
            depth += 2;
        }

        Ok(result)
    }

    /// Faces of the queried leaves whose own bounds overlap `bounds`.
    pub fn candidates<'a>(
        &'a self,
        leaves: &'a LeafQuery,
        bounds: &'a Aabb,
    ) -> impl Iterator<Item = usize> + 'a {
        leaves
            .as_slice()
            .iter()
            .flat_map(move |&node| self.nodes[node as usize].face_range())
            .filter(move |&face| self.bounds[face].intersects(bounds))
    }

    /// Every face of the queried leaves, without per-face filtering.
    pub fn leaf_faces<'a>(&'a self, leaves: &'a LeafQuery) -> impl Iterator<Item = usize> + 'a {
        leaves
            .as_slice()
            .iter()
            .flat_map(move |&node| self.nodes[node as usize].face_range())
    }
}

/// Collects triangles and builds a [`Bvh`].
///
/// All faces must wind counter-clockwise when seen from the side the
/// player stands on.
#[derive(Debug, Clone)]
pub struct BvhBuilder {
    faces: Vec<Face>,
    max_leaf_size: usize,
}

impl Default for BvhBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BvhBuilder {
    pub fn new() -> Self {
        Self {
            faces: Vec::new(),
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
        }
    }

    pub fn with_max_leaf_size(mut self, max_leaf_size: usize) -> Self {
        self.max_leaf_size = max_leaf_size.max(1);
        self
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn add_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) -> &mut Self {
        self.faces.push(Face::new(a, b, c));
        self
    }

    /// Add a planar quad `a, b, c, d` as two triangles.
    pub fn add_quad(&mut self, a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> &mut Self {
        self.add_triangle(a, b, c);
        self.add_triangle(a, c, d)
    }

    /// Add an axis-aligned box with outward facing triangles.
    ///
    /// # Arguments
    ///
    /// * `center` - Center of the box in world space
    /// * `half_extents` - Half-size in each axis (x, y, z)
    pub fn add_box(&mut self, center: Vec3, half_extents: Vec3) -> &mut Self {
        let corner = |sx: f32, sy: f32, sz: f32| {
            center + Vec3::new(sx * half_extents.x, sy * half_extents.y, sz * half_extents.z)
        };

        // +Y, -Y
        self.add_quad(corner(-1.0, 1.0, 1.0), corner(1.0, 1.0, 1.0), corner(1.0, 1.0, -1.0), corner(-1.0, 1.0, -1.0));
        self.add_quad(corner(-1.0, -1.0, -1.0), corner(1.0, -1.0, -1.0), corner(1.0, -1.0, 1.0), corner(-1.0, -1.0, 1.0));
        // +X, -X
        self.add_quad(corner(1.0, -1.0, 1.0), corner(1.0, -1.0, -1.0), corner(1.0, 1.0, -1.0), corner(1.0, 1.0, 1.0));
        self.add_quad(corner(-1.0, -1.0, -1.0), corner(-1.0, -1.0, 1.0), corner(-1.0, 1.0, 1.0), corner(-1.0, 1.0, -1.0));
        // +Z, -Z
        self.add_quad(corner(-1.0, -1.0, 1.0), corner(1.0, -1.0, 1.0), corner(1.0, 1.0, 1.0), corner(-1.0, 1.0, 1.0));
        self.add_quad(corner(1.0, -1.0, -1.0), corner(-1.0, -1.0, -1.0), corner(-1.0, 1.0, -1.0), corner(1.0, 1.0, -1.0))
    }

    /// Add an indexed triangle mesh.
    ///
    /// # Arguments
    ///
    /// * `vertices` - Mesh vertex positions
    /// * `indices` - Triangle indices (3 per triangle)
    pub fn add_triangle_mesh(
        &mut self,
        vertices: &[Vec3],
        indices: &[[u32; 3]],
    ) -> Result<&mut Self, BvhError> {
        for triangle in indices {
            if let Some(&index) = triangle.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(BvhError::IndexOutOfRange {
                    index,
                    vertex_count: vertices.len(),
                });
            }
        }

        for [a, b, c] in indices {
            self.add_triangle(vertices[*a as usize], vertices[*b as usize], vertices[*c as usize]);
        }

        Ok(self)
    }

    /// Compute normals and bounds, then split on the median centroid of the
    /// longest axis until leaves are small enough.
    pub fn build(&self) -> Result<Bvh, BvhError> {
        if self.faces.is_empty() {
            return Err(BvhError::Empty);
        }

        let mut normals = Vec::with_capacity(self.faces.len());
        for (index, face) in self.faces.iter().enumerate() {
            let normal = face
                .compute_normal()
                .ok_or(BvhError::DegenerateTriangle { index })?;
            normals.push(normal);
        }

        let bounds: Vec<Aabb> = self.faces.iter().map(face_aabb).collect();
        let centroids: Vec<Vec3> = self.faces.iter().map(Face::centroid).collect();

        let mut order: Vec<usize> = (0..self.faces.len()).collect();
        let mut nodes = Vec::with_capacity(2 * self.faces.len());
        nodes.push(BvhNode {
            bounds: merged_bounds(&bounds, &order),
            left_first: 0,
            tri_count: order.len() as u32,
        });
        self.subdivide(0, 0, &mut order, &bounds, &centroids, &mut nodes);

        log::debug!(
            "Built BVH with {} faces and {} nodes",
            self.faces.len(),
            nodes.len()
        );

        Ok(Bvh {
            faces: order.iter().map(|&i| self.faces[i]).collect(),
            normals: order.iter().map(|&i| normals[i]).collect(),
            bounds: order.iter().map(|&i| bounds[i]).collect(),
            nodes,
        })
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn subdivide(
        &self,
        node_index: usize,
        first: usize,
        order: &mut [usize],
        bounds: &[Aabb],
        centroids: &[Vec3],
        nodes: &mut Vec<BvhNode>,
    ) {
        if order.len() <= self.max_leaf_size {
            return;
        }

        let (min, max) = order.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), &i| (min.min(centroids[i]), max.max(centroids[i])),
        );
        let extent = max - min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        order.sort_by(|&a, &b| centroids[a][axis].total_cmp(&centroids[b][axis]));
        let mid = order.len() / 2;

        let left = nodes.len();
        let (left_order, right_order) = order.split_at_mut(mid);
        nodes.push(BvhNode {
            bounds: merged_bounds(bounds, left_order),
            left_first: first as u32,
            tri_count: left_order.len() as u32,
        });
        nodes.push(BvhNode {
            bounds: merged_bounds(bounds, right_order),
            left_first: (first + mid) as u32,
            tri_count: right_order.len() as u32,
        });
        nodes[node_index].left_first = left as u32;
        nodes[node_index].tri_count = 0;

        self.subdivide(left, first, left_order, bounds, centroids, nodes);
        self.subdivide(left + 1, first + mid, right_order, bounds, centroids, nodes);
    }
}

fn face_aabb(face: &Face) -> Aabb {
    let [a, b, c] = face.points;
    aabb_from_min_max(a.min(b).min(c), a.max(b).max(c))
}

fn merged_bounds(bounds: &[Aabb], order: &[usize]) -> Aabb {
    let mut merged = bounds[order[0]];
    for &i in &order[1..] {
        merged.merge(&bounds[i]);
    }
    merged
}

/// Glam corners of an [`Aabb`].
#[inline]
pub fn aabb_min_max(aabb: &Aabb) -> (Vec3, Vec3) {
    (from_point(&aabb.mins), from_point(&aabb.maxs))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_builder(size: usize, spacing: f32) -> BvhBuilder {
        let mut builder = BvhBuilder::new();
        for x in 0..size {
            for z in 0..size {
                let origin = Vec3::new(x as f32 * spacing, 0.0, -(z as f32) * spacing);
                builder.add_quad(
                    origin,
                    origin + Vec3::new(spacing, 0.0, 0.0),
                    origin + Vec3::new(spacing, 0.0, -spacing),
                    origin + Vec3::new(0.0, 0.0, -spacing),
                );
            }
        }
        builder
    }

    #[test]
    fn test_box_normals_point_outward() {
        let mut builder = BvhBuilder::new();
        builder.add_box(Vec3::new(10.0, 5.0, -3.0), Vec3::new(2.0, 1.0, 4.0));
        let bvh = builder.build().unwrap();

        assert_eq!(bvh.face_count(), 12);
        for i in 0..bvh.face_count() {
            let to_face = bvh.face(i).centroid() - Vec3::new(10.0, 5.0, -3.0);
            assert!(to_face.dot(bvh.normal(i)) > 0.0, "face {i} points inward");
        }

        let floors = (0..12).filter(|&i| bvh.is_floor(i)).count();
        assert_eq!(floors, 2);
    }

    #[test]
    fn test_query_matches_brute_force() {
        let bvh = grid_builder(8, 10.0).build().unwrap();
        let query_box = aabb_from_min_max(Vec3::new(12.0, -1.0, -38.0), Vec3::new(31.0, 1.0, -21.0));

        let leaves = bvh.query(&query_box).unwrap();
        let mut found: Vec<usize> = bvh.candidates(&leaves, &query_box).collect();
        found.sort_unstable();

        let expected: Vec<usize> = (0..bvh.face_count())
            .filter(|&i| bvh.face_bounds(i).intersects(&query_box))
            .collect();

        assert!(!expected.is_empty());
        assert_eq!(found, expected);
    }

    #[test]
    fn test_query_miss() {
        let bvh = grid_builder(4, 10.0).build().unwrap();
        let far = aabb_from_min_max(Vec3::new(500.0, 500.0, 500.0), Vec3::new(510.0, 510.0, 510.0));
        assert!(bvh.query(&far).unwrap().is_empty());
    }

    #[test]
    fn test_query_capacity() {
        let bvh = grid_builder(20, 1.0).with_max_leaf_size(1).build().unwrap();
        let everything = *bvh.root_bounds();

        assert_eq!(
            bvh.query(&everything).unwrap_err(),
            CollisionError::CapacityExceeded {
                capacity: MAX_INTERSECTIONS
            }
        );
    }

    #[test]
    fn test_build_errors() {
        assert_eq!(BvhBuilder::new().build().unwrap_err(), BvhError::Empty);

        let mut builder = BvhBuilder::new();
        builder.add_triangle(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert_eq!(
            builder.build().unwrap_err(),
            BvhError::DegenerateTriangle { index: 0 }
        );

        let mut builder = BvhBuilder::new();
        let result = builder.add_triangle_mesh(&[Vec3::ZERO, Vec3::X], &[[0, 1, 2]]);
        assert!(matches!(result, Err(BvhError::IndexOutOfRange { index: 2, vertex_count: 2 })));
    }

    #[test]
    fn test_leaves_cover_every_face_once() {
        let bvh = grid_builder(5, 3.0).build().unwrap();
        let mut seen = vec![0u32; bvh.face_count()];
        for node in bvh.nodes().iter().filter(|n| n.is_leaf()) {
            assert!(node.tri_count as usize <= DEFAULT_MAX_LEAF_SIZE);
            for face in node.face_range() {
                seen[face] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }
}
