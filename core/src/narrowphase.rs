//! Default narrow phase: contact manifold generation for circle and box
//! pairs. The world only depends on the [`CollideFn`] contract, so an
//! embedding engine can substitute its own shape catalog.

use crate::body::RigidBody;
use crate::math::Vec2;
use crate::shapes::Shape;

/// Identifies a manifold point by the shape features that produced it.
/// Stable across ticks while the same features stay in contact, which is
/// what lets a persistent point inherit its warm-start impulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactFeature(u32);

impl ContactFeature {
    /// Feature triple: edge index on A, edge index on B, clip point index.
    pub fn new(edge_a: u8, edge_b: u8, index: u8) -> Self {
        Self(((edge_a as u32) << 16) | ((edge_b as u32) << 8) | index as u32)
    }

    /// Circle contacts have a single feature.
    pub fn circle() -> Self {
        Self(u32::MAX)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ManifoldPoint {
    /// World-space contact point.
    pub point: Vec2,
    pub penetration: f32,
    pub feature: ContactFeature,
}

/// Contact manifold between two bodies. The normal points from A to B.
#[derive(Debug, Clone)]
pub struct ContactManifold {
    pub normal: Vec2,
    pub points: Vec<ManifoldPoint>,
}

/// The narrow-phase interface contract: produce a manifold for two
/// overlapping bodies, or `None` when they are separated.
pub type CollideFn = fn(&RigidBody, &RigidBody) -> Option<ContactManifold>;

/// Default manifold provider for the built-in shapes.
pub fn collide(a: &RigidBody, b: &RigidBody) -> Option<ContactManifold> {
    match (&a.shape, &b.shape) {
        (Shape::Circle { .. }, Shape::Circle { .. }) => circle_vs_circle(a, b),
        (Shape::Circle { .. }, Shape::Box { .. }) => circle_vs_box(a, b, false),
        (Shape::Box { .. }, Shape::Circle { .. }) => circle_vs_box(b, a, true),
        (Shape::Box { .. }, Shape::Box { .. }) => box_vs_box(a, b),
    }
}

fn circle_vs_circle(a: &RigidBody, b: &RigidBody) -> Option<ContactManifold> {
    let (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) = (a.shape, b.shape) else {
        return None;
    };

    let d = b.position - a.position;
    let dist_sq = d.length_squared();
    let sum_r = ra + rb;
    if dist_sq >= sum_r * sum_r {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-8 { d / dist } else { Vec2::X };
    let penetration = sum_r - dist;
    let point = a.position + normal * (ra - penetration * 0.5);

    Some(ContactManifold {
        normal,
        points: vec![ManifoldPoint {
            point,
            penetration,
            feature: ContactFeature::circle(),
        }],
    })
}

/// `swapped` means the original call had the box as body A.
fn circle_vs_box(circle: &RigidBody, boxb: &RigidBody, swapped: bool) -> Option<ContactManifold> {
    let Shape::Circle { radius } = circle.shape else {
        return None;
    };
    let Shape::Box { half_w, half_h } = boxb.shape else {
        return None;
    };

    // Work in the box's local frame so the box is axis-aligned.
    let local = boxb.global_to_local(circle.position);
    let closest = Vec2::new(local.x.clamp(-half_w, half_w), local.y.clamp(-half_h, half_h));
    let delta = local - closest;
    let dist_sq = delta.length_squared();
    if dist_sq >= radius * radius {
        return None;
    }

    let inside = local.x.abs() < half_w && local.y.abs() < half_h;
    let (local_normal, penetration) = if inside {
        // Center inside the box: push out along the shallower axis.
        let overlap_x = half_w - local.x.abs();
        let overlap_y = half_h - local.y.abs();
        if overlap_x < overlap_y {
            let sign = if local.x >= 0.0 { 1.0 } else { -1.0 };
            (Vec2::new(sign, 0.0), overlap_x + radius)
        } else {
            let sign = if local.y >= 0.0 { 1.0 } else { -1.0 };
            (Vec2::new(0.0, sign), overlap_y + radius)
        }
    } else {
        let dist = dist_sq.sqrt();
        let n = if dist > 1e-8 { delta / dist } else { Vec2::X };
        (n, radius - dist)
    };

    let point = boxb.local_to_global(closest);
    // Normal from box toward circle, in world space.
    let box_to_circle = local_normal.rotate(boxb.rotation);
    let normal = if swapped { box_to_circle } else { -box_to_circle };

    Some(ContactManifold {
        normal,
        points: vec![ManifoldPoint {
            point,
            penetration,
            feature: ContactFeature::circle(),
        }],
    })
}

/// Maximum separation of `b` from the edges of `a` (SAT). Returns the
/// separation and the edge index on `a`; negative separation = overlap.
fn find_max_separation(a_verts: &[Vec2], b_verts: &[Vec2]) -> (f32, usize) {
    let mut max_sep = f32::MIN;
    let mut best_edge = 0;
    let n = a_verts.len();
    for i in 0..n {
        let v0 = a_verts[i];
        let v1 = a_verts[(i + 1) % n];
        let edge = v1 - v0;
        let len = edge.length();
        if len < 1e-8 {
            continue;
        }
        // Outward normal for counter-clockwise winding.
        let normal = Vec2::new(edge.y, -edge.x) / len;

        let mut min_dot = f32::MAX;
        for &bv in b_verts {
            min_dot = min_dot.min((bv - v0).dot(normal));
        }
        if min_dot > max_sep {
            max_sep = min_dot;
            best_edge = i;
        }
    }
    (max_sep, best_edge)
}

/// Edge on the incident polygon most anti-parallel to the reference
/// normal.
fn find_incident_edge(inc_verts: &[Vec2], ref_normal: Vec2) -> usize {
    let n = inc_verts.len();
    let mut min_dot = f32::MAX;
    let mut best_edge = 0;
    for i in 0..n {
        let v0 = inc_verts[i];
        let v1 = inc_verts[(i + 1) % n];
        let edge = v1 - v0;
        let len = edge.length();
        if len < 1e-8 {
            continue;
        }
        let normal = Vec2::new(edge.y, -edge.x) / len;
        let dot = normal.dot(ref_normal);
        if dot < min_dot {
            min_dot = dot;
            best_edge = i;
        }
    }
    best_edge
}

/// Clips the segment v0-v1 against the half-plane through `point` with
/// the given normal, keeping the positive side.
fn clip_segment(v0: Vec2, v1: Vec2, point: Vec2, normal: Vec2) -> Vec<Vec2> {
    let mut out = Vec::with_capacity(2);
    let d0 = (v0 - point).dot(normal);
    let d1 = (v1 - point).dot(normal);
    if d0 >= 0.0 {
        out.push(v0);
    }
    if d1 >= 0.0 {
        out.push(v1);
    }
    if d0 * d1 < 0.0 {
        let t = d0 / (d0 - d1);
        out.push(v0 + (v1 - v0) * t);
    }
    out
}

/// Oriented box vs box: SAT to pick the reference face, then clip the
/// incident edge against the reference side planes. Up to two points.
fn box_vs_box(a: &RigidBody, b: &RigidBody) -> Option<ContactManifold> {
    let verts_a = a.shape.world_vertices(a.position, a.rotation);
    let verts_b = b.shape.world_vertices(b.position, b.rotation);
    if verts_a.len() < 3 || verts_b.len() < 3 {
        return None;
    }

    let (sep_a, edge_a) = find_max_separation(&verts_a, &verts_b);
    let (sep_b, edge_b) = find_max_separation(&verts_b, &verts_a);
    if sep_a > 0.0 || sep_b > 0.0 {
        return None;
    }

    // Reference face = smaller penetration, biased toward A so the
    // choice is stable frame to frame.
    let (ref_verts, inc_verts, ref_edge, flip) = if sep_a > sep_b - 0.001 {
        (&verts_a, &verts_b, edge_a, false)
    } else {
        (&verts_b, &verts_a, edge_b, true)
    };

    let n = ref_verts.len();
    let ref_v0 = ref_verts[ref_edge];
    let ref_v1 = ref_verts[(ref_edge + 1) % n];
    let ref_dir = ref_v1 - ref_v0;
    let ref_len = ref_dir.length();
    if ref_len < 1e-8 {
        return None;
    }
    let tangent = ref_dir / ref_len;
    let ref_normal = Vec2::new(ref_dir.y, -ref_dir.x) / ref_len;

    let inc_edge = find_incident_edge(inc_verts, ref_normal);
    let inc_v0 = inc_verts[inc_edge];
    let inc_v1 = inc_verts[(inc_edge + 1) % inc_verts.len()];

    // Clip to the side planes at the reference edge endpoints.
    let clipped = clip_segment(inc_v0, inc_v1, ref_v0, tangent);
    if clipped.is_empty() {
        return None;
    }
    let clipped = if clipped.len() >= 2 {
        clip_segment(clipped[0], clipped[1], ref_v1, -tangent)
    } else {
        clipped
    };

    let mut points = Vec::with_capacity(2);
    for (i, &cp) in clipped.iter().enumerate() {
        let sep = (cp - ref_v0).dot(ref_normal);
        if sep <= 0.0 {
            // Keep the feature ordered (A edge, B edge) regardless of
            // which box was the reference.
            let feature = if flip {
                ContactFeature::new(inc_edge as u8, ref_edge as u8, i as u8)
            } else {
                ContactFeature::new(ref_edge as u8, inc_edge as u8, i as u8)
            };
            points.push(ManifoldPoint {
                point: cp,
                penetration: -sep,
                feature,
            });
        }
    }
    if points.is_empty() {
        return None;
    }

    let mut normal = if flip { -ref_normal } else { ref_normal };
    // Keep the A-to-B orientation even in degenerate overlaps.
    if (b.position - a.position).dot(normal) < 0.0 {
        normal = -normal;
    }

    Some(ContactManifold { normal, points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{BodyType, RigidBody};
    use approx::assert_relative_eq;

    fn body(id: u32, shape: Shape, x: f32, y: f32) -> RigidBody {
        RigidBody::new(id, BodyType::Dynamic, shape, Vec2::new(x, y), 1.0)
    }

    #[test]
    fn separated_circles_produce_no_manifold() {
        let a = body(0, Shape::Circle { radius: 1.0 }, 0.0, 0.0);
        let b = body(1, Shape::Circle { radius: 1.0 }, 3.0, 0.0);
        assert!(collide(&a, &b).is_none());
    }

    #[test]
    fn overlapping_circles_normal_points_a_to_b() {
        let a = body(0, Shape::Circle { radius: 1.0 }, 0.0, 0.0);
        let b = body(1, Shape::Circle { radius: 1.0 }, 1.5, 0.0);
        let m = collide(&a, &b).unwrap();
        assert_relative_eq!(m.normal.x, 1.0);
        assert_eq!(m.points.len(), 1);
        assert_relative_eq!(m.points[0].penetration, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn circle_on_box_face() {
        let floor = body(0, Shape::Box { half_w: 5.0, half_h: 1.0 }, 0.0, 0.0);
        let ball = body(1, Shape::Circle { radius: 0.5 }, 0.0, 1.4);
        let m = collide(&floor, &ball).unwrap();
        assert_relative_eq!(m.normal.y, 1.0, epsilon = 1e-6);
        assert_relative_eq!(m.points[0].penetration, 0.1, epsilon = 1e-5);
    }

    #[test]
    fn face_to_face_boxes_give_two_points() {
        let a = body(0, Shape::Box { half_w: 1.0, half_h: 1.0 }, 0.0, 0.0);
        let b = body(1, Shape::Box { half_w: 1.0, half_h: 1.0 }, 0.0, 1.9);
        let m = collide(&a, &b).unwrap();
        assert_eq!(m.points.len(), 2);
        assert_relative_eq!(m.normal.y, 1.0, epsilon = 1e-6);
        for p in &m.points {
            assert_relative_eq!(p.penetration, 0.1, epsilon = 1e-5);
        }
    }

    #[test]
    fn feature_ids_stable_across_small_motion() {
        let a = body(0, Shape::Box { half_w: 1.0, half_h: 1.0 }, 0.0, 0.0);
        let mut b = body(1, Shape::Box { half_w: 1.0, half_h: 1.0 }, 0.0, 1.9);
        let m1 = collide(&a, &b).unwrap();
        b.position.x += 0.01;
        let m2 = collide(&a, &b).unwrap();
        let f1: Vec<_> = m1.points.iter().map(|p| p.feature).collect();
        let f2: Vec<_> = m2.points.iter().map(|p| p.feature).collect();
        assert_eq!(f1, f2);
    }
}
