//! Geometric primitives and classifiers.
//!
//! Everything here is a pure function of its inputs. The time-of-impact
//! search and the bucket processing build on these predicates, so they use
//! exact closest-point math rather than approximations.

use glam::Vec3;
use parry3d::math::{Point, Real};
use parry3d::query::PointQueryWithLocation;
use parry3d::shape::{Triangle, TrianglePointLocation};
use serde::{Deserialize, Serialize};

/// Tolerance for plane tests and "is this length zero" checks.
pub const EPSILON_LOW: f32 = 1.0e-3;

/// Tolerance for comparing impact times.
pub const EPSILON_MEDIUM: f32 = 1.0e-4;

/// Squared distance under which a projected point is considered on the face.
const ON_FACE_EPSILON_SQ: f32 = 1.0e-8;

#[inline]
pub(crate) fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

#[inline]
pub(crate) fn from_point(p: &Point<Real>) -> Vec3 {
    Vec3::new(p.x, p.y, p.z)
}

/// A world-space triangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub points: [Vec3; 3],
}

impl Face {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { points: [a, b, c] }
    }

    /// Point used as the plane origin.
    #[inline]
    pub fn anchor(&self) -> Vec3 {
        self.points[0]
    }

    /// Unit normal following counter-clockwise winding, `None` if degenerate.
    pub fn compute_normal(&self) -> Option<Vec3> {
        let [a, b, c] = self.points;
        Triangle::new(to_point(a), to_point(b), to_point(c))
            .normal()
            .map(|n| Vec3::new(n.x, n.y, n.z))
    }

    pub fn centroid(&self) -> Vec3 {
        (self.points[0] + self.points[1] + self.points[2]) / 3.0
    }

    fn as_triangle(&self) -> Triangle {
        let [a, b, c] = self.points;
        Triangle::new(to_point(a), to_point(b), to_point(c))
    }

    /// Closest point on the triangle and whether it lies strictly inside.
    fn project(&self, point: Vec3) -> (Vec3, ContactRegion) {
        let (projection, location) = self
            .as_triangle()
            .project_local_point_and_get_location(&to_point(point), false);
        let region = match location {
            TrianglePointLocation::OnFace(..) | TrianglePointLocation::OnSolid => {
                ContactRegion::Face
            }
            _ => ContactRegion::Edge,
        };
        (from_point(&projection.point), region)
    }
}

/// Vertical capsule: a segment of length `2 * half_height` swept by a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub center: Vec3,
    pub half_height: f32,
    pub radius: f32,
}

impl Capsule {
    pub fn new(center: Vec3, half_height: f32, radius: f32) -> Self {
        Self {
            center,
            half_height,
            radius,
        }
    }

    /// Bottom and top end points of the inner segment.
    #[inline]
    pub fn segment(&self) -> (Vec3, Vec3) {
        let offset = Vec3::new(0.0, self.half_height, 0.0);
        (self.center - offset, self.center + offset)
    }

    /// Copy of this capsule moved by `offset`.
    #[inline]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            center: self.center + offset,
            ..*self
        }
    }

    /// Half size of the axis-aligned box enclosing the capsule.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        Vec3::new(self.radius, self.half_height + self.radius, self.radius)
    }
}

/// Side of a plane a point lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halfspace {
    Front,
    Back,
    On,
}

/// Relationship between the planes of two faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneClassification {
    Distinct,
    Colinear,
    ColinearOppositeFacing,
}

/// Which part of the triangle the capsule touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRegion {
    Face,
    Edge,
}

/// Outcome of a capsule/triangle overlap test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapsuleFaceClassification {
    NoCollision,
    /// Closest triangle point is in the interior.
    Face,
    /// Closest triangle point is on an edge or a vertex.
    Edge,
    /// The inner segment pierces the triangle.
    AxisIntersectsFace,
}

/// Full result of [`classify_capsule_face`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleFaceContact {
    pub classification: CapsuleFaceClassification,
    /// Translation that separates the capsule from the face (zero if none).
    pub penetration: Vec3,
    /// Center of the sphere on the inner segment closest to the face.
    pub sphere_center: Vec3,
    /// Closest point on the face.
    pub nearest_point: Vec3,
}

impl CapsuleFaceContact {
    #[inline]
    pub fn collides(&self) -> bool {
        self.classification != CapsuleFaceClassification::NoCollision
    }
}

/// Classify `point` against the plane of `face`.
pub fn classify_point_halfspace(face: &Face, normal: Vec3, point: Vec3) -> Halfspace {
    let distance = (point - face.anchor()).dot(normal);
    if distance > EPSILON_LOW {
        Halfspace::Front
    } else if distance < -EPSILON_LOW {
        Halfspace::Back
    } else {
        Halfspace::On
    }
}

/// Decide whether two faces lie on the same plane, and with which facing.
pub fn classify_planes(
    face_a: &Face,
    normal_a: Vec3,
    face_b: &Face,
    normal_b: Vec3,
) -> PlaneClassification {
    let dot = normal_a.dot(normal_b);
    if dot.abs() < 1.0 - EPSILON_LOW {
        return PlaneClassification::Distinct;
    }

    let coplanar = face_b
        .points
        .iter()
        .all(|p| (*p - face_a.anchor()).dot(normal_a).abs() <= EPSILON_LOW);
    if !coplanar {
        return PlaneClassification::Distinct;
    }

    if dot > 0.0 {
        PlaneClassification::Colinear
    } else {
        PlaneClassification::ColinearOppositeFacing
    }
}

/// Closest points between segments `[p1, q1]` and `[p2, q2]`.
fn closest_points_segments(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> (Vec3, Vec3) {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.dot(d1);
    let e = d2.dot(d2);
    let f = d2.dot(r);

    if a <= f32::EPSILON && e <= f32::EPSILON {
        return (p1, p2);
    }

    let (s, t) = if a <= f32::EPSILON {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let s = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}

/// Test a capsule against a triangle and compute the separating translation.
pub fn classify_capsule_face(capsule: &Capsule, face: &Face, normal: Vec3) -> CapsuleFaceContact {
    let (a, b) = capsule.segment();
    let anchor = face.anchor();
    let da = (a - anchor).dot(normal);
    let db = (b - anchor).dot(normal);

    if da * db <= 0.0 && (da - db).abs() > f32::EPSILON {
        let t = da / (da - db);
        let crossing = a + (b - a) * t;
        let (projected, _) = face.project(crossing);
        if projected.distance_squared(crossing) <= ON_FACE_EPSILON_SQ {
            let (deepest, depth) = if da < db { (a, da) } else { (b, db) };
            return CapsuleFaceContact {
                classification: CapsuleFaceClassification::AxisIntersectsFace,
                penetration: normal * (capsule.radius - depth),
                sphere_center: deepest,
                nearest_point: crossing,
            };
        }
    }

    let mut best_distance_sq = f32::MAX;
    let mut best = (a, a, ContactRegion::Face);

    for endpoint in [a, b] {
        let (on_face, region) = face.project(endpoint);
        let distance_sq = endpoint.distance_squared(on_face);
        if distance_sq < best_distance_sq {
            best_distance_sq = distance_sq;
            best = (endpoint, on_face, region);
        }
    }

    for i in 0..3 {
        let (on_segment, on_edge) =
            closest_points_segments(a, b, face.points[i], face.points[(i + 1) % 3]);
        let distance_sq = on_segment.distance_squared(on_edge);
        if distance_sq < best_distance_sq {
            best_distance_sq = distance_sq;
            best = (on_segment, on_edge, ContactRegion::Edge);
        }
    }

    let (sphere_center, nearest_point, region) = best;
    if best_distance_sq >= capsule.radius * capsule.radius {
        return CapsuleFaceContact {
            classification: CapsuleFaceClassification::NoCollision,
            penetration: Vec3::ZERO,
            sphere_center,
            nearest_point,
        };
    }

    let distance = best_distance_sq.sqrt();
    let direction = if distance > EPSILON_MEDIUM {
        (sphere_center - nearest_point) / distance
    } else {
        normal
    };

    CapsuleFaceContact {
        classification: match region {
            ContactRegion::Face => CapsuleFaceClassification::Face,
            ContactRegion::Edge => CapsuleFaceClassification::Edge,
        },
        penetration: direction * (capsule.radius - distance),
        sphere_center,
        nearest_point,
    }
}

/// Grow a triangle in its own plane so every edge moves out by `distance`.
///
/// The triangle is scaled about its incenter, which keeps the edges parallel
/// to the originals. Degenerate triangles are returned unchanged.
pub fn extended_face(face: &Face, distance: f32) -> Face {
    let [p0, p1, p2] = face.points;
    let a = (p1 - p2).length();
    let b = (p2 - p0).length();
    let c = (p0 - p1).length();
    let perimeter = a + b + c;
    let double_area = (p1 - p0).cross(p2 - p0).length();

    if perimeter <= f32::EPSILON || double_area <= f32::EPSILON {
        return *face;
    }

    let incenter = (p0 * a + p1 * b + p2 * c) / perimeter;
    let inradius = double_area / perimeter;
    let scale = (inradius + distance) / inradius;

    Face {
        points: face.points.map(|p| incenter + (p - incenter) * scale),
    }
}

/// Earliest fraction of `displacement` at which the capsule touches the face.
///
/// Bisection over `[0, 1]`, stopping after `iterations` halvings or once the
/// bracket is shorter than `limit_distance` in world units. Returns the last
/// known separated fraction, or `0.0` if the capsule already overlaps.
pub fn find_capsule_face_intersection_time(
    capsule: &Capsule,
    face: &Face,
    normal: Vec3,
    displacement: Vec3,
    iterations: u32,
    limit_distance: f32,
) -> f32 {
    if classify_capsule_face(capsule, face, normal).collides() {
        return 0.0;
    }

    let length = displacement.length();
    let mut lo = 0.0_f32;
    let mut hi = 1.0_f32;

    for _ in 0..iterations {
        if (hi - lo) * length <= limit_distance {
            break;
        }

        let mid = (lo + hi) * 0.5;
        let moved = capsule.translated(displacement * mid);
        if classify_capsule_face(&moved, face, normal).collides() {
            hi = mid;
        } else {
            lo = mid;
        }
    }

    lo
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_face() -> (Face, Vec3) {
        // Counter-clockwise seen from above
        let face = Face::new(
            Vec3::new(-100.0, 0.0, 100.0),
            Vec3::new(100.0, 0.0, 100.0),
            Vec3::new(0.0, 0.0, -100.0),
        );
        (face, Vec3::Y)
    }

    #[test]
    fn test_compute_normal() {
        let (face, _) = floor_face();
        let normal = face.compute_normal().unwrap();
        assert!((normal - Vec3::Y).length() < 1e-5);

        let degenerate = Face::new(Vec3::ZERO, Vec3::X, Vec3::X * 2.0);
        assert!(degenerate.compute_normal().is_none());
    }

    #[test]
    fn test_point_halfspace() {
        let (face, normal) = floor_face();
        assert_eq!(classify_point_halfspace(&face, normal, Vec3::new(0.0, 1.0, 0.0)), Halfspace::Front);
        assert_eq!(classify_point_halfspace(&face, normal, Vec3::new(0.0, -1.0, 0.0)), Halfspace::Back);
        assert_eq!(classify_point_halfspace(&face, normal, Vec3::new(50.0, 0.0, 3.0)), Halfspace::On);
    }

    #[test]
    fn test_classify_planes() {
        let (face, normal) = floor_face();

        let same = Face::new(
            Vec3::new(300.0, 0.0, 0.0),
            Vec3::new(400.0, 0.0, 0.0),
            Vec3::new(300.0, 0.0, -100.0),
        );
        assert_eq!(classify_planes(&face, normal, &same, normal), PlaneClassification::Colinear);

        let flipped = Face::new(same.points[0], same.points[2], same.points[1]);
        assert_eq!(
            classify_planes(&face, normal, &flipped, -normal),
            PlaneClassification::ColinearOppositeFacing
        );

        let raised = Face {
            points: same.points.map(|p| p + Vec3::Y),
        };
        assert_eq!(classify_planes(&face, normal, &raised, normal), PlaneClassification::Distinct);

        let wall = Face::new(Vec3::ZERO, Vec3::Y, Vec3::Z);
        assert_eq!(classify_planes(&face, normal, &wall, Vec3::X), PlaneClassification::Distinct);
    }

    #[test]
    fn test_capsule_above_floor_is_clear() {
        let (face, normal) = floor_face();
        let capsule = Capsule::new(Vec3::new(0.0, 30.0, 0.0), 12.0, 16.0);

        let contact = classify_capsule_face(&capsule, &face, normal);
        assert_eq!(contact.classification, CapsuleFaceClassification::NoCollision);
        assert_eq!(contact.penetration, Vec3::ZERO);
    }

    #[test]
    fn test_capsule_sinking_into_floor() {
        let (face, normal) = floor_face();
        // Bottom of the capsule at y = -2
        let capsule = Capsule::new(Vec3::new(0.0, 26.0, 0.0), 12.0, 16.0);

        let contact = classify_capsule_face(&capsule, &face, normal);
        assert_eq!(contact.classification, CapsuleFaceClassification::Face);
        assert!((contact.penetration - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-3);
        assert!((contact.nearest_point - Vec3::ZERO).length() < 1e-3);
    }

    #[test]
    fn test_capsule_axis_through_floor() {
        let (face, normal) = floor_face();
        let capsule = Capsule::new(Vec3::new(0.0, 4.0, 0.0), 12.0, 16.0);

        let contact = classify_capsule_face(&capsule, &face, normal);
        assert_eq!(contact.classification, CapsuleFaceClassification::AxisIntersectsFace);
        // Lowest segment point is at y = -8, needs 8 + 16 to clear
        assert!((contact.penetration - Vec3::new(0.0, 24.0, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_capsule_touching_edge() {
        let face = Face::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -10.0),
        );
        // Beside the x axis edge, slightly overlapping it horizontally
        let capsule = Capsule::new(Vec3::new(5.0, 0.0, 15.0), 12.0, 16.0);

        let contact = classify_capsule_face(&capsule, &face, Vec3::Y);
        assert_eq!(contact.classification, CapsuleFaceClassification::Edge);
        assert!((contact.penetration - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-3);
    }

    #[test]
    fn test_extended_face_moves_edges_out() {
        let face = Face::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, -10.0),
        );
        let extended = extended_face(&face, 2.0);

        // Edge along z = 0 moved to z = 2, edge along x = 0 moved to x = -2
        assert!(extended.points.iter().any(|p| (p.z - 2.0).abs() < 1e-4));
        assert!(extended.points.iter().any(|p| (p.x + 2.0).abs() < 1e-4));
        assert!(extended.points.iter().all(|p| p.y.abs() < 1e-6));
        assert!((extended.compute_normal().unwrap() - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_intersection_time_falling_on_floor() {
        let (face, normal) = floor_face();
        let capsule = Capsule::new(Vec3::new(0.0, 100.0, 0.0), 12.0, 16.0);

        let t = find_capsule_face_intersection_time(
            &capsule,
            &face,
            normal,
            Vec3::new(0.0, -100.0, 0.0),
            16,
            1.0e-3,
        );

        // Contact when the center reaches y = 28, i.e. after 72% of the move
        assert!((t - 0.72).abs() < 1.0e-3, "t = {t}");
        let rest = capsule.translated(Vec3::new(0.0, -100.0 * t, 0.0));
        assert!(!classify_capsule_face(&rest, &face, normal).collides());
    }

    #[test]
    fn test_intersection_time_already_overlapping() {
        let (face, normal) = floor_face();
        let capsule = Capsule::new(Vec3::new(0.0, 20.0, 0.0), 12.0, 16.0);

        let t = find_capsule_face_intersection_time(
            &capsule,
            &face,
            normal,
            Vec3::new(0.0, -10.0, 0.0),
            16,
            1.0e-3,
        );
        assert_eq!(t, 0.0);
    }
}
