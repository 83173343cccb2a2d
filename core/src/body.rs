use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::math::{Vec2, cross_sv};
use crate::shapes::{Shape, mass_properties};
use crate::tree::NodeId;

pub type BodyId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Never integrated; zero inverse mass and inertia.
    Static,
    Dynamic,
}

/// A rigid body: pose, velocity, and mass state.
///
/// The inverse mass/inertia caches are owned by [`RigidBody::set_mass`];
/// mutating `mass` or `inertia` directly would desynchronize them, so both
/// are read-only outside this module.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyId,
    pub body_type: BodyType,
    pub shape: Shape,
    pub position: Vec2,
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub force: Vec2,
    pub torque: f32,
    mass: f32,
    inv_mass: f32,
    inertia: f32,
    inv_inertia: f32,
    pub restitution: f32,
    pub friction: f32,
    /// Baumgarte factor fed into contact penetration bias.
    pub contact_beta: f32,
    pub layer: u16,
    pub mask: u16,
    /// Back-pointer into the broad-phase tree; the tree clears it on
    /// removal.
    pub(crate) node: Option<NodeId>,
}

impl RigidBody {
    pub fn new(id: BodyId, body_type: BodyType, shape: Shape, position: Vec2, mass: f32) -> Self {
        let (inv_mass, inertia, inv_inertia) = mass_properties(&shape, mass, body_type);
        Self {
            id,
            body_type,
            shape,
            position,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: if body_type == BodyType::Static { 0.0 } else { mass },
            inv_mass,
            inertia,
            inv_inertia,
            restitution: 0.3,
            friction: 0.5,
            contact_beta: 0.2,
            layer: 0xFFFF,
            mask: 0xFFFF,
            node: None,
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia
    }

    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Replaces the mass and recomputes inertia and both inverse caches
    /// from the current shape in one go.
    pub fn set_mass(&mut self, mass: f32) {
        let (inv_mass, inertia, inv_inertia) = mass_properties(&self.shape, mass, self.body_type);
        self.mass = if self.body_type == BodyType::Static { 0.0 } else { mass };
        self.inv_mass = inv_mass;
        self.inertia = inertia;
        self.inv_inertia = inv_inertia;
    }

    /// Body-local point to world space at the current pose. Valid for the
    /// current tick only; poses move under the caller between ticks.
    #[inline]
    pub fn local_to_global(&self, p: Vec2) -> Vec2 {
        self.position + p.rotate(self.rotation)
    }

    /// World-space point to body-local space at the current pose.
    #[inline]
    pub fn global_to_local(&self, p: Vec2) -> Vec2 {
        (p - self.position).rotate_inv(self.rotation)
    }

    /// Tight (un-padded) world AABB of the body's shape.
    #[inline]
    pub fn world_aabb(&self) -> Aabb {
        self.shape.world_aabb(self.position, self.rotation)
    }

    /// World-space velocity of a point offset `r` from the center.
    #[inline]
    pub fn velocity_at(&self, r: Vec2) -> Vec2 {
        self.linear_velocity + cross_sv(self.angular_velocity, r)
    }

    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: f32) {
        self.torque += torque;
    }

    /// Instantaneous center-of-mass impulse.
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        self.linear_velocity += impulse * self.inv_mass;
    }

    /// First half of semi-implicit Euler: forces and gravity into
    /// velocity. Accumulated forces are consumed. Statics are skipped.
    pub(crate) fn integrate_forces(&mut self, gravity: Vec2, h: f32) {
        if self.is_static() {
            self.force = Vec2::ZERO;
            self.torque = 0.0;
            return;
        }
        self.linear_velocity += (gravity + self.force * self.inv_mass) * h;
        self.angular_velocity += self.torque * self.inv_inertia * h;
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Second half: velocity into pose. Runs after the velocity solve.
    pub(crate) fn integrate_pose(&mut self, h: f32) {
        if self.is_static() {
            return;
        }
        self.position += self.linear_velocity * h;
        self.rotation += self.angular_velocity * h;
    }
}

/// Mutable references to two distinct slots of the body arena.
/// Panics if `a == b`; returns `None` when either slot is empty.
pub(crate) fn body_pair_mut(
    bodies: &mut [Option<RigidBody>],
    a: BodyId,
    b: BodyId,
) -> Option<(&mut RigidBody, &mut RigidBody)> {
    let (a, b) = (a as usize, b as usize);
    assert_ne!(a, b, "constraint references the same body twice");
    if a < b {
        let (lo, hi) = bodies.split_at_mut(b);
        Some((lo[a].as_mut()?, hi[0].as_mut()?))
    } else {
        let (lo, hi) = bodies.split_at_mut(a);
        let first = hi[0].as_mut()?;
        let second = lo[b].as_mut()?;
        Some((first, second))
    }
}
