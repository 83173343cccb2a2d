//! Contact constraints: one normal row and one tangent row per manifold
//! point, solved with accumulated-impulse clamping.

use crate::body::{BodyId, RigidBody, body_pair_mut};
use crate::math::Vec2;
use crate::narrowphase::{ContactFeature, ContactManifold};
use crate::world::WorldSettings;

#[derive(Debug, Clone)]
pub struct ContactPoint {
    /// Offsets from each body's center to the contact point, world space.
    pub ra: Vec2,
    pub rb: Vec2,
    pub penetration: f32,
    pub feature: ContactFeature,
    normal_mass: f32,
    tangent_mass: f32,
    /// Target separating speed: restitution bounce + penetration bias.
    bias: f32,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
}

/// All contact points between one pair of bodies for the current tick.
#[derive(Debug, Clone)]
pub struct ContactConstraint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Contact normal from A to B.
    pub normal: Vec2,
    tangent: Vec2,
    friction: f32,
    restitution: f32,
    contact_beta: f32,
    pub points: Vec<ContactPoint>,
}

impl ContactConstraint {
    pub fn new(manifold: &ContactManifold, a: &RigidBody, b: &RigidBody) -> Self {
        let points: Vec<ContactPoint> = manifold
            .points
            .iter()
            .map(|p| ContactPoint {
                ra: p.point - a.position,
                rb: p.point - b.position,
                penetration: p.penetration,
                feature: p.feature,
                normal_mass: 0.0,
                tangent_mass: 0.0,
                bias: 0.0,
                normal_impulse: 0.0,
                tangent_impulse: 0.0,
            })
            .collect();
        Self {
            body_a: a.id,
            body_b: b.id,
            normal: manifold.normal,
            tangent: manifold.normal.perp(),
            friction: (a.friction * b.friction).sqrt(),
            restitution: a.restitution.min(b.restitution),
            contact_beta: 0.5 * (a.contact_beta + b.contact_beta),
            points,
        }
    }

    pub fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let n = self.normal;
        let t = self.tangent;

        for p in &mut self.points {
            let rn_a = p.ra.cross(n);
            let rn_b = p.rb.cross(n);
            let k_n = a.inv_mass()
                + b.inv_mass()
                + rn_a * rn_a * a.inv_inertia()
                + rn_b * rn_b * b.inv_inertia();
            p.normal_mass = if k_n > 0.0 { 1.0 / k_n } else { 0.0 };

            let rt_a = p.ra.cross(t);
            let rt_b = p.rb.cross(t);
            let k_t = a.inv_mass()
                + b.inv_mass()
                + rt_a * rt_a * a.inv_inertia()
                + rt_b * rt_b * b.inv_inertia();
            p.tangent_mass = if k_t > 0.0 { 1.0 / k_t } else { 0.0 };

            // Restitution from the approach speed at prepare time.
            let vn = (b.velocity_at(p.rb) - a.velocity_at(p.ra)).dot(n);
            let approach = -vn;
            let bounce = self.restitution * (approach - settings.restitution_slop).max(0.0);

            let baumgarte = if settings.position_correction {
                (self.contact_beta / h) * (p.penetration - settings.linear_slop).max(0.0)
            } else {
                0.0
            };
            p.bias = bounce + baumgarte;

            if settings.warm_starting {
                // Re-apply the impulse this point carried over.
                let impulse = n * p.normal_impulse + t * p.tangent_impulse;
                a.linear_velocity -= impulse * a.inv_mass();
                a.angular_velocity -= p.ra.cross(impulse) * a.inv_inertia();
                b.linear_velocity += impulse * b.inv_mass();
                b.angular_velocity += p.rb.cross(impulse) * b.inv_inertia();
            } else {
                p.normal_impulse = 0.0;
                p.tangent_impulse = 0.0;
            }
        }
    }

    pub fn solve(&mut self, bodies: &mut [Option<RigidBody>]) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let n = self.normal;
        let t = self.tangent;

        for p in &mut self.points {
            // Normal row. The accumulated impulse stays non-negative:
            // contacts push, never pull.
            let vn = (b.velocity_at(p.rb) - a.velocity_at(p.ra)).dot(n);
            let lambda = -p.normal_mass * (vn - p.bias);
            let old = p.normal_impulse;
            p.normal_impulse = (old + lambda).max(0.0);
            let delta = p.normal_impulse - old;

            let impulse = n * delta;
            a.linear_velocity -= impulse * a.inv_mass();
            a.angular_velocity -= p.ra.cross(impulse) * a.inv_inertia();
            b.linear_velocity += impulse * b.inv_mass();
            b.angular_velocity += p.rb.cross(impulse) * b.inv_inertia();

            // Tangent row, clamped to the Coulomb cone of the current
            // accumulated normal impulse.
            let vt = (b.velocity_at(p.rb) - a.velocity_at(p.ra)).dot(t);
            let lambda_t = -p.tangent_mass * vt;
            let max_friction = self.friction * p.normal_impulse;
            let old_t = p.tangent_impulse;
            p.tangent_impulse = (old_t + lambda_t).clamp(-max_friction, max_friction);
            let delta_t = p.tangent_impulse - old_t;

            let impulse = t * delta_t;
            a.linear_velocity -= impulse * a.inv_mass();
            a.angular_velocity -= p.ra.cross(impulse) * a.inv_inertia();
            b.linear_velocity += impulse * b.inv_mass();
            b.angular_velocity += p.rb.cross(impulse) * b.inv_inertia();
        }
    }
}
