//! Joint constraints. Every joint follows the same protocol: `prepare`
//! assembles the Jacobian and effective mass at the current pose and
//! re-applies the warm-start impulse, `solve` computes
//! `λ = M_eff · −(J·v + bias + γ·λ_acc)` and feeds it back into the body
//! velocities.

use std::f32::consts::TAU;

use crate::body::{BodyId, RigidBody, body_pair_mut};
use crate::math::{Mat2, Mat3, Vec2, Vec3};
use crate::world::WorldSettings;

pub type JointId = u32;

/// Baumgarte factor for hard (non-spring) joints.
const HARD_BETA: f32 = 0.2;

const MIN_FREQUENCY: f32 = 0.01;

/// Spring-damper parameters reduced to bias and softness terms during
/// `prepare`.
#[derive(Debug, Clone, Copy)]
pub struct Softness {
    frequency_hz: f32,
    damping_ratio: f32,
    /// Reference mass override; defaults to body B's mass.
    pub mass: Option<f32>,
}

impl Softness {
    pub fn new(frequency_hz: f32, damping_ratio: f32) -> Self {
        if frequency_hz < MIN_FREQUENCY {
            log::warn!("joint frequency {frequency_hz} Hz clamped to {MIN_FREQUENCY}");
        }
        if !(0.0..=1.0).contains(&damping_ratio) {
            log::warn!("joint damping ratio {damping_ratio} clamped to [0, 1]");
        }
        Self {
            frequency_hz: frequency_hz.max(MIN_FREQUENCY),
            damping_ratio: damping_ratio.clamp(0.0, 1.0),
            mass: None,
        }
    }
}

/// β and γ for one prepare call. `None` softness means a hard constraint:
/// no compliance, fixed Baumgarte bias factor.
fn solver_scalars(soft: Option<&Softness>, default_mass: f32, h: f32) -> (f32, f32) {
    match soft {
        None => (HARD_BETA, 0.0),
        Some(s) => {
            let m = s.mass.unwrap_or(default_mass).max(1e-6);
            let omega = TAU * s.frequency_hz;
            let d = 2.0 * m * s.damping_ratio * omega;
            let k = m * omega * omega;
            let hk = h * k;
            (hk / (d + hk), 1.0 / ((d + hk) * h))
        }
    }
}

/// Reference mass for the spring: body B, falling back to body A when B
/// is static.
fn spring_mass(a: &RigidBody, b: &RigidBody) -> f32 {
    if b.mass() > 0.0 { b.mass() } else { a.mass() }
}

/// Applies a linear impulse at the two anchor offsets, equal and
/// opposite.
fn apply_at_anchors(a: &mut RigidBody, b: &mut RigidBody, ra: Vec2, rb: Vec2, impulse: Vec2) {
    a.linear_velocity -= impulse * a.inv_mass();
    a.angular_velocity -= ra.cross(impulse) * a.inv_inertia();
    b.linear_velocity += impulse * b.inv_mass();
    b.angular_velocity += rb.cross(impulse) * b.inv_inertia();
}

/// Keeps the two anchor points a fixed distance apart.
#[derive(Debug, Clone)]
pub struct DistanceJoint {
    pub(crate) id: JointId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length: f32,
    pub soft: Option<Softness>,
    impulse: f32,
    ra: Vec2,
    rb: Vec2,
    normal: Vec2,
    mass: f32,
    bias: f32,
    gamma: f32,
}

impl DistanceJoint {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        length: f32,
    ) -> Self {
        Self {
            id: 0,
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            length: length.max(0.0),
            soft: None,
            impulse: 0.0,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            normal: Vec2::X,
            mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let pa = a.local_to_global(self.local_anchor_a);
        let pb = b.local_to_global(self.local_anchor_b);
        self.ra = pa - a.position;
        self.rb = pb - b.position;
        let d = pb - pa;
        let dist = d.length();
        self.normal = if dist > 1e-8 { d / dist } else { Vec2::X };

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), spring_mass(a, b), h);
        self.gamma = gamma;

        let rn_a = self.ra.cross(self.normal);
        let rn_b = self.rb.cross(self.normal);
        let k = a.inv_mass()
            + b.inv_mass()
            + rn_a * rn_a * a.inv_inertia()
            + rn_b * rn_b * b.inv_inertia()
            + gamma;
        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        let c = dist - self.length;
        self.bias = if settings.position_correction { beta / h * c } else { 0.0 };

        if settings.warm_starting {
            apply_at_anchors(a, b, self.ra, self.rb, self.normal * self.impulse);
        } else {
            self.impulse = 0.0;
        }
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let jv = (b.velocity_at(self.rb) - a.velocity_at(self.ra)).dot(self.normal);
        let lambda = -self.mass * (jv + self.bias + self.gamma * self.impulse);
        apply_at_anchors(a, b, self.ra, self.rb, self.normal * lambda);
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// Pins the two anchor points together while leaving rotation free.
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    pub(crate) id: JointId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub soft: Option<Softness>,
    impulse: Vec2,
    ra: Vec2,
    rb: Vec2,
    mass: Mat2,
    bias: Vec2,
    gamma: f32,
}

impl RevoluteJoint {
    pub fn new(body_a: BodyId, body_b: BodyId, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        Self {
            id: 0,
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            soft: None,
            impulse: Vec2::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            mass: Mat2::default(),
            bias: Vec2::ZERO,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let pa = a.local_to_global(self.local_anchor_a);
        let pb = b.local_to_global(self.local_anchor_b);
        self.ra = pa - a.position;
        self.rb = pb - b.position;

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), spring_mass(a, b), h);
        self.gamma = gamma;

        let (ima, iia) = (a.inv_mass(), a.inv_inertia());
        let (imb, iib) = (b.inv_mass(), b.inv_inertia());
        let k11 = ima + imb + iia * self.ra.y * self.ra.y + iib * self.rb.y * self.rb.y;
        let k12 = -iia * self.ra.x * self.ra.y - iib * self.rb.x * self.rb.y;
        let k22 = ima + imb + iia * self.ra.x * self.ra.x + iib * self.rb.x * self.rb.x;
        let k = Mat2::new(k11 + gamma, k12, k12, k22 + gamma);
        self.mass = k.inverse().unwrap_or_default();

        let c = pb - pa;
        self.bias = if settings.position_correction {
            c * (beta / h)
        } else {
            Vec2::ZERO
        };

        if settings.warm_starting {
            apply_at_anchors(a, b, self.ra, self.rb, self.impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let jv = b.velocity_at(self.rb) - a.velocity_at(self.ra);
        let lambda = self.mass * -(jv + self.bias + self.impulse * self.gamma);
        apply_at_anchors(a, b, self.ra, self.rb, lambda);
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// One-body joint dragging an anchor toward a world-space target.
/// Usually configured soft; a hard grab snaps.
#[derive(Debug, Clone)]
pub struct GrabJoint {
    pub(crate) id: JointId,
    pub body: BodyId,
    pub local_anchor: Vec2,
    pub target: Vec2,
    pub soft: Option<Softness>,
    impulse: Vec2,
    r: Vec2,
    mass: Mat2,
    bias: Vec2,
    gamma: f32,
}

impl GrabJoint {
    pub fn new(body: BodyId, local_anchor: Vec2, target: Vec2) -> Self {
        Self {
            id: 0,
            body,
            local_anchor,
            target,
            soft: None,
            impulse: Vec2::ZERO,
            r: Vec2::ZERO,
            mass: Mat2::default(),
            bias: Vec2::ZERO,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some(body) = bodies[self.body as usize].as_mut() else {
            return;
        };
        let p = body.local_to_global(self.local_anchor);
        self.r = p - body.position;

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), body.mass(), h);
        self.gamma = gamma;

        let (im, ii) = (body.inv_mass(), body.inv_inertia());
        let k11 = im + ii * self.r.y * self.r.y;
        let k12 = -ii * self.r.x * self.r.y;
        let k22 = im + ii * self.r.x * self.r.x;
        let k = Mat2::new(k11 + gamma, k12, k12, k22 + gamma);
        self.mass = k.inverse().unwrap_or_default();

        let c = p - self.target;
        self.bias = if settings.position_correction {
            c * (beta / h)
        } else {
            Vec2::ZERO
        };

        if settings.warm_starting {
            body.linear_velocity += self.impulse * im;
            body.angular_velocity += self.r.cross(self.impulse) * ii;
        } else {
            self.impulse = Vec2::ZERO;
        }
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some(body) = bodies[self.body as usize].as_mut() else {
            return;
        };
        let jv = body.velocity_at(self.r);
        let lambda = self.mass * -(jv + self.bias + self.impulse * self.gamma);
        body.linear_velocity += lambda * body.inv_mass();
        body.angular_velocity += self.r.cross(lambda) * body.inv_inertia();
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// Locks both anchors and the relative rotation: two translational rows
/// plus one angular row, solved as a 3x3 system.
#[derive(Debug, Clone)]
pub struct WeldJoint {
    pub(crate) id: JointId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Relative rotation the joint maintains, captured at creation.
    pub reference_angle: f32,
    pub soft: Option<Softness>,
    impulse: Vec3,
    ra: Vec2,
    rb: Vec2,
    mass: Mat3,
    bias: Vec3,
    gamma: f32,
}

impl WeldJoint {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        reference_angle: f32,
    ) -> Self {
        Self {
            id: 0,
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            reference_angle,
            soft: None,
            impulse: Vec3::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            mass: Mat3::default(),
            bias: Vec3::ZERO,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, impulse: Vec3) {
        let linear = impulse.xy();
        a.linear_velocity -= linear * a.inv_mass();
        a.angular_velocity -= (self.ra.cross(linear) + impulse.z) * a.inv_inertia();
        b.linear_velocity += linear * b.inv_mass();
        b.angular_velocity += (self.rb.cross(linear) + impulse.z) * b.inv_inertia();
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let pa = a.local_to_global(self.local_anchor_a);
        let pb = b.local_to_global(self.local_anchor_b);
        self.ra = pa - a.position;
        self.rb = pb - b.position;

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), spring_mass(a, b), h);
        self.gamma = gamma;

        let (ima, iia) = (a.inv_mass(), a.inv_inertia());
        let (imb, iib) = (b.inv_mass(), b.inv_inertia());
        let (rax, ray) = (self.ra.x, self.ra.y);
        let (rbx, rby) = (self.rb.x, self.rb.y);
        let k11 = ima + imb + iia * ray * ray + iib * rby * rby;
        let k12 = -iia * rax * ray - iib * rbx * rby;
        let k13 = -iia * ray - iib * rby;
        let k22 = ima + imb + iia * rax * rax + iib * rbx * rbx;
        let k23 = iia * rax + iib * rbx;
        let k33 = iia + iib;
        let k = Mat3::new([
            [k11 + gamma, k12, k13],
            [k12, k22 + gamma, k23],
            [k13, k23, k33 + gamma],
        ]);
        self.mass = k.inverse().unwrap_or_default();

        let c_linear = pb - pa;
        let c_angular = b.rotation - a.rotation - self.reference_angle;
        self.bias = if settings.position_correction {
            Vec3::new(c_linear.x, c_linear.y, c_angular) * (beta / h)
        } else {
            Vec3::ZERO
        };

        if settings.warm_starting {
            let impulse = self.impulse;
            self.apply(a, b, impulse);
        } else {
            self.impulse = Vec3::ZERO;
        }
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let rel = b.velocity_at(self.rb) - a.velocity_at(self.ra);
        let jv = Vec3::new(rel.x, rel.y, b.angular_velocity - a.angular_velocity);
        let lambda = self.mass * -(jv + self.bias + self.impulse * self.gamma);
        self.apply(a, b, lambda);
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// Confines body B's anchor to the line through body A's anchor along a
/// slide axis fixed in A's frame. One row: motion perpendicular to the
/// axis is removed, sliding and rotation stay free.
#[derive(Debug, Clone)]
pub struct LineJoint {
    pub(crate) id: JointId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Slide axis in body A's local frame, unit length.
    pub local_axis: Vec2,
    pub soft: Option<Softness>,
    impulse: f32,
    ra: Vec2,
    rb: Vec2,
    perp: Vec2,
    sa: f32,
    sb: f32,
    mass: f32,
    bias: f32,
    gamma: f32,
}

impl LineJoint {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        local_axis: Vec2,
    ) -> Self {
        let axis = local_axis.normalize();
        Self {
            id: 0,
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            local_axis: if axis == Vec2::ZERO { Vec2::X } else { axis },
            soft: None,
            impulse: 0.0,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            perp: Vec2::ZERO,
            sa: 0.0,
            sb: 0.0,
            mass: 0.0,
            bias: 0.0,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let pa = a.local_to_global(self.local_anchor_a);
        let pb = b.local_to_global(self.local_anchor_b);
        self.ra = pa - a.position;
        self.rb = pb - b.position;
        let d = pb - pa;

        let axis = self.local_axis.rotate(a.rotation);
        self.perp = axis.perp();
        self.sa = (d + self.ra).cross(self.perp);
        self.sb = self.rb.cross(self.perp);

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), spring_mass(a, b), h);
        self.gamma = gamma;

        let k = a.inv_mass()
            + b.inv_mass()
            + self.sa * self.sa * a.inv_inertia()
            + self.sb * self.sb * b.inv_inertia()
            + gamma;
        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        let c = d.dot(self.perp);
        self.bias = if settings.position_correction { beta / h * c } else { 0.0 };

        if settings.warm_starting {
            self.apply(a, b, self.impulse);
        } else {
            self.impulse = 0.0;
        }
    }

    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, lambda: f32) {
        let p = self.perp * lambda;
        a.linear_velocity -= p * a.inv_mass();
        a.angular_velocity -= self.sa * lambda * a.inv_inertia();
        b.linear_velocity += p * b.inv_mass();
        b.angular_velocity += self.sb * lambda * b.inv_inertia();
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let jv = self.perp.dot(b.linear_velocity - a.linear_velocity)
            + self.sb * b.angular_velocity
            - self.sa * a.angular_velocity;
        let lambda = -self.mass * (jv + self.bias + self.gamma * self.impulse);
        self.apply(a, b, lambda);
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// Line joint plus an angular lock: B slides along A's axis without
/// relative rotation. Two rows solved as a 2x2 system.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    pub(crate) id: JointId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis: Vec2,
    pub reference_angle: f32,
    pub soft: Option<Softness>,
    impulse: Vec2,
    ra: Vec2,
    rb: Vec2,
    perp: Vec2,
    sa: f32,
    sb: f32,
    mass: Mat2,
    bias: Vec2,
    gamma: f32,
}

impl PrismaticJoint {
    pub fn new(
        body_a: BodyId,
        body_b: BodyId,
        local_anchor_a: Vec2,
        local_anchor_b: Vec2,
        local_axis: Vec2,
        reference_angle: f32,
    ) -> Self {
        let axis = local_axis.normalize();
        Self {
            id: 0,
            body_a,
            body_b,
            local_anchor_a,
            local_anchor_b,
            local_axis: if axis == Vec2::ZERO { Vec2::X } else { axis },
            reference_angle,
            soft: None,
            impulse: Vec2::ZERO,
            ra: Vec2::ZERO,
            rb: Vec2::ZERO,
            perp: Vec2::ZERO,
            sa: 0.0,
            sb: 0.0,
            mass: Mat2::default(),
            bias: Vec2::ZERO,
            gamma: 0.0,
        }
    }

    pub fn with_softness(mut self, soft: Softness) -> Self {
        self.soft = Some(soft);
        self
    }

    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, lambda: Vec2) {
        let p = self.perp * lambda.x;
        a.linear_velocity -= p * a.inv_mass();
        a.angular_velocity -= (self.sa * lambda.x + lambda.y) * a.inv_inertia();
        b.linear_velocity += p * b.inv_mass();
        b.angular_velocity += (self.sb * lambda.x + lambda.y) * b.inv_inertia();
    }

    fn prepare(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings, h: f32) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let pa = a.local_to_global(self.local_anchor_a);
        let pb = b.local_to_global(self.local_anchor_b);
        self.ra = pa - a.position;
        self.rb = pb - b.position;
        let d = pb - pa;

        let axis = self.local_axis.rotate(a.rotation);
        self.perp = axis.perp();
        self.sa = (d + self.ra).cross(self.perp);
        self.sb = self.rb.cross(self.perp);

        let (beta, gamma) = solver_scalars(self.soft.as_ref(), spring_mass(a, b), h);
        self.gamma = gamma;

        let (ima, iia) = (a.inv_mass(), a.inv_inertia());
        let (imb, iib) = (b.inv_mass(), b.inv_inertia());
        let k11 = ima + imb + iia * self.sa * self.sa + iib * self.sb * self.sb;
        let k12 = iia * self.sa + iib * self.sb;
        let k22 = iia + iib;
        let k = Mat2::new(k11 + gamma, k12, k12, k22 + gamma);
        self.mass = k.inverse().unwrap_or_default();

        let c = Vec2::new(
            d.dot(self.perp),
            b.rotation - a.rotation - self.reference_angle,
        );
        self.bias = if settings.position_correction {
            c * (beta / h)
        } else {
            Vec2::ZERO
        };

        if settings.warm_starting {
            let impulse = self.impulse;
            self.apply(a, b, impulse);
        } else {
            self.impulse = Vec2::ZERO;
        }
    }

    fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        let Some((a, b)) = body_pair_mut(bodies, self.body_a, self.body_b) else {
            return;
        };
        let jv = Vec2::new(
            self.perp.dot(b.linear_velocity - a.linear_velocity)
                + self.sb * b.angular_velocity
                - self.sa * a.angular_velocity,
            b.angular_velocity - a.angular_velocity,
        );
        let lambda = self.mass * -(jv + self.bias + self.impulse * self.gamma);
        self.apply(a, b, lambda);
        if settings.warm_starting {
            self.impulse += lambda;
        }
    }
}

/// Closed set of joint kinds. The solver iterates joints through this
/// enum so iteration order stays centrally controlled.
#[derive(Debug, Clone)]
pub enum Joint {
    Distance(DistanceJoint),
    Revolute(RevoluteJoint),
    Grab(GrabJoint),
    Weld(WeldJoint),
    Line(LineJoint),
    Prismatic(PrismaticJoint),
}

impl Joint {
    pub fn id(&self) -> JointId {
        match self {
            Joint::Distance(j) => j.id,
            Joint::Revolute(j) => j.id,
            Joint::Grab(j) => j.id,
            Joint::Weld(j) => j.id,
            Joint::Line(j) => j.id,
            Joint::Prismatic(j) => j.id,
        }
    }

    pub(crate) fn set_id(&mut self, id: JointId) {
        match self {
            Joint::Distance(j) => j.id = id,
            Joint::Revolute(j) => j.id = id,
            Joint::Grab(j) => j.id = id,
            Joint::Weld(j) => j.id = id,
            Joint::Line(j) => j.id = id,
            Joint::Prismatic(j) => j.id = id,
        }
    }

    /// The bodies the joint references; single-body joints return `None`
    /// for the second slot.
    pub fn bodies(&self) -> (BodyId, Option<BodyId>) {
        match self {
            Joint::Distance(j) => (j.body_a, Some(j.body_b)),
            Joint::Revolute(j) => (j.body_a, Some(j.body_b)),
            Joint::Grab(j) => (j.body, None),
            Joint::Weld(j) => (j.body_a, Some(j.body_b)),
            Joint::Line(j) => (j.body_a, Some(j.body_b)),
            Joint::Prismatic(j) => (j.body_a, Some(j.body_b)),
        }
    }

    pub fn references(&self, body: BodyId) -> bool {
        let (a, b) = self.bodies();
        a == body || b == Some(body)
    }

    pub(crate) fn prepare(
        &mut self,
        bodies: &mut [Option<RigidBody>],
        settings: &WorldSettings,
        h: f32,
    ) {
        match self {
            Joint::Distance(j) => j.prepare(bodies, settings, h),
            Joint::Revolute(j) => j.prepare(bodies, settings, h),
            Joint::Grab(j) => j.prepare(bodies, settings, h),
            Joint::Weld(j) => j.prepare(bodies, settings, h),
            Joint::Line(j) => j.prepare(bodies, settings, h),
            Joint::Prismatic(j) => j.prepare(bodies, settings, h),
        }
    }

    pub(crate) fn solve(&mut self, bodies: &mut [Option<RigidBody>], settings: &WorldSettings) {
        match self {
            Joint::Distance(j) => j.solve(bodies, settings),
            Joint::Revolute(j) => j.solve(bodies, settings),
            Joint::Grab(j) => j.solve(bodies, settings),
            Joint::Weld(j) => j.solve(bodies, settings),
            Joint::Line(j) => j.solve(bodies, settings),
            Joint::Prismatic(j) => j.solve(bodies, settings),
        }
    }
}
