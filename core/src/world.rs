use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aabb::Aabb;
use crate::body::{BodyId, BodyType, RigidBody};
use crate::contact::ContactConstraint;
use crate::error::PhysicsError;
use crate::joints::{Joint, JointId};
use crate::math::Vec2;
use crate::narrowphase::{CollideFn, ContactFeature, collide};
use crate::shapes::Shape;
use crate::tree::AabbTree;

/// World-global solver configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldSettings {
    pub gravity: Vec2,
    /// Fixed solver time step in seconds.
    pub fixed_delta_time: f32,
    /// Gauss-Seidel velocity iterations per sub-step.
    pub velocity_iterations: u32,
    pub position_correction: bool,
    pub warm_starting: bool,
    /// Enlargement applied to dynamic leaves in the broad-phase tree.
    pub aabb_margin: f32,
    /// Approach speeds below this produce no restitution bounce.
    pub restitution_slop: f32,
    /// Penetration below this produces no position-correction bias.
    pub linear_slop: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            fixed_delta_time: 1.0 / 60.0,
            velocity_iterations: 10,
            position_correction: true,
            warm_starting: true,
            aabb_margin: 0.05,
            restitution_slop: 0.005,
            linear_slop: 0.005,
        }
    }
}

impl WorldSettings {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.fixed_delta_time > 0.0) {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "fixed_delta_time must be positive, got {}",
                self.fixed_delta_time
            )));
        }
        if self.velocity_iterations < 1 {
            return Err(PhysicsError::InvalidConfiguration(
                "velocity_iterations must be at least 1".into(),
            ));
        }
        if self.aabb_margin < 0.0 || self.restitution_slop < 0.0 || self.linear_slop < 0.0 {
            return Err(PhysicsError::InvalidConfiguration(
                "margins and slops must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Owns all bodies and joints and drives the fixed-timestep simulation.
pub struct World {
    settings: WorldSettings,
    bodies: Vec<Option<RigidBody>>,
    free_ids: Vec<BodyId>,
    next_id: BodyId,
    tree: AabbTree,
    joints: Vec<Joint>,
    next_joint_id: JointId,
    contacts: Vec<ContactConstraint>,
    /// Accumulated impulses from the previous tick, keyed by contact
    /// identity so persistent points warm-start.
    warm_cache: HashMap<(BodyId, BodyId, ContactFeature), (f32, f32)>,
    collide: CollideFn,
    accumulator: f32,
}

impl World {
    pub fn new(settings: WorldSettings) -> Result<Self, PhysicsError> {
        settings.validate()?;
        Ok(Self {
            settings,
            bodies: Vec::new(),
            free_ids: Vec::new(),
            next_id: 0,
            tree: AabbTree::new(),
            joints: Vec::new(),
            next_joint_id: 0,
            contacts: Vec::new(),
            warm_cache: HashMap::new(),
            collide,
            accumulator: 0.0,
        })
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    /// Replaces the narrow-phase provider. The default handles the
    /// built-in circle and box shapes.
    pub fn set_collide_fn(&mut self, f: CollideFn) {
        self.collide = f;
    }

    pub fn add_body(
        &mut self,
        body_type: BodyType,
        shape: Shape,
        position: Vec2,
        mass: f32,
    ) -> Result<BodyId, PhysicsError> {
        if body_type == BodyType::Dynamic && mass <= 0.0 {
            return Err(PhysicsError::InvalidConfiguration(format!(
                "dynamic body needs positive mass, got {mass}"
            )));
        }

        let id = if let Some(recycled) = self.free_ids.pop() {
            recycled
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        };

        let mut body = RigidBody::new(id, body_type, shape, position, mass);
        let fat = self.enlarged_aabb(&body);
        body.node = Some(self.tree.insert(id, fat));

        let idx = id as usize;
        if idx >= self.bodies.len() {
            self.bodies.resize_with(idx + 1, || None);
        }
        self.bodies[idx] = Some(body);
        Ok(id)
    }

    /// Removes a body, its tree leaf, and every joint referencing it.
    pub fn remove_body(&mut self, id: BodyId) {
        let idx = id as usize;
        let Some(slot) = self.bodies.get_mut(idx) else {
            return;
        };
        let Some(mut body) = slot.take() else {
            return;
        };

        if let Some(node) = body.node.take() {
            self.tree.remove(node);
        }

        let before = self.joints.len();
        self.joints.retain(|j| !j.references(id));
        let dropped = before - self.joints.len();
        if dropped > 0 {
            log::debug!("removed body {id}: invalidated {dropped} joint(s)");
        }

        self.warm_cache
            .retain(|&(a, b, _), _| a != id && b != id);
        self.free_ids.push(id);
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id as usize)?.as_ref()
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id as usize)?.as_mut()
    }

    pub fn add_joint(&mut self, mut joint: Joint) -> Result<JointId, PhysicsError> {
        let (a, b) = joint.bodies();
        let body_a = self.body(a).ok_or_else(|| {
            PhysicsError::DanglingReference(format!("joint references unknown body {a}"))
        })?;
        match b {
            Some(b) => {
                let body_b = self.body(b).ok_or_else(|| {
                    PhysicsError::DanglingReference(format!("joint references unknown body {b}"))
                })?;
                if body_a.is_static() && body_b.is_static() {
                    return Err(PhysicsError::InvalidConfiguration(
                        "joint connects two static bodies".into(),
                    ));
                }
            }
            None => {
                if body_a.is_static() {
                    return Err(PhysicsError::InvalidConfiguration(
                        "grab joint on a static body".into(),
                    ));
                }
            }
        }

        let id = self.next_joint_id;
        self.next_joint_id += 1;
        joint.set_id(id);
        self.joints.push(joint);
        Ok(id)
    }

    pub fn remove_joint(&mut self, id: JointId) {
        self.joints.retain(|j| j.id() != id);
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.iter().find(|j| j.id() == id)
    }

    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.iter_mut().find(|j| j.id() == id)
    }

    pub fn apply_force(&mut self, id: BodyId, force: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.apply_force(force);
        }
    }

    pub fn apply_impulse(&mut self, id: BodyId, impulse: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.apply_impulse(impulse);
        }
    }

    pub fn set_velocity(&mut self, id: BodyId, velocity: Vec2) {
        if let Some(body) = self.body_mut(id) {
            body.linear_velocity = velocity;
        }
    }

    /// Bodies whose broad-phase AABB contains the point.
    pub fn query_point(&self, p: Vec2) -> Vec<BodyId> {
        self.tree.query_point(p)
    }

    /// Bodies whose broad-phase AABB overlaps the region.
    pub fn query_region(&self, region: Aabb) -> Vec<BodyId> {
        self.tree.query_region(region)
    }

    /// Contact constraints generated in the most recent sub-step.
    pub fn contacts(&self) -> &[ContactConstraint] {
        &self.contacts
    }

    /// Broad-phase tree diagnostics (summed node area).
    pub fn tree_cost(&self) -> f32 {
        self.tree.cost()
    }

    /// Structural check of the broad phase: tree invariants plus body to
    /// leaf back-pointer agreement. Panics on violation.
    pub fn validate_broad_phase(&self) {
        self.tree.validate();
        for body in self.bodies.iter().flatten() {
            let node = body.node.expect("body missing from broad phase");
            assert_eq!(self.tree.leaf_body(node), Some(body.id));
        }
    }

    /// Advances the simulation. Real time is accumulated and consumed in
    /// whole fixed sub-steps; a remainder shorter than the fixed step is
    /// carried to the next call.
    pub fn step(&mut self, dt: f32) {
        self.accumulator += dt;
        while self.accumulator >= self.settings.fixed_delta_time {
            self.sub_step(self.settings.fixed_delta_time);
            self.accumulator -= self.settings.fixed_delta_time;
        }
    }

    fn enlarged_aabb(&self, body: &RigidBody) -> Aabb {
        let margin = if body.is_static() {
            0.0
        } else {
            self.settings.aabb_margin
        };
        body.world_aabb().expand(margin)
    }

    /// Reinserts leaves whose body escaped the enlarged AABB stored in
    /// the tree.
    fn sync_tree(&mut self) {
        for idx in 0..self.bodies.len() {
            let Some(body) = self.bodies[idx].as_ref() else {
                continue;
            };
            let Some(node) = body.node else { continue };
            let tight = body.world_aabb();
            if self.tree.node_aabb(node).contains(&tight) {
                continue;
            }
            let fat = self.enlarged_aabb(body);
            let id = body.id;
            self.tree.remove(node);
            let new_node = self.tree.insert(id, fat);
            if let Some(body) = self.bodies[idx].as_mut() {
                body.node = Some(new_node);
            }
        }
    }

    fn sub_step(&mut self, h: f32) {
        // 1. External forces and gravity into velocities.
        let gravity = self.settings.gravity;
        for body in self.bodies.iter_mut().flatten() {
            body.integrate_forces(gravity, h);
        }

        // 2. Broad phase: refresh moved leaves, then enumerate pairs.
        self.sync_tree();
        let pairs = self.tree.collision_pairs();

        // 3. Narrow phase. Pairs failing the layer/mask filter are
        // dropped before shape testing.
        self.contacts.clear();
        for (id_a, id_b) in pairs {
            // Canonical order keeps the contact frame (and the sign of
            // cached tangent impulses) stable across ticks.
            let (id_a, id_b) = (id_a.min(id_b), id_a.max(id_b));
            let (Some(a), Some(b)) = (self.body(id_a), self.body(id_b)) else {
                continue;
            };
            if (a.layer & b.mask) == 0 || (b.layer & a.mask) == 0 {
                continue;
            }
            if a.is_static() && b.is_static() {
                continue;
            }
            if let Some(manifold) = (self.collide)(a, b) {
                let mut contact = ContactConstraint::new(&manifold, a, b);
                if self.settings.warm_starting {
                    for p in &mut contact.points {
                        let key = (id_a, id_b, p.feature);
                        if let Some(&(jn, jt)) = self.warm_cache.get(&key) {
                            p.normal_impulse = jn;
                            p.tangent_impulse = jt;
                        }
                    }
                }
                self.contacts.push(contact);
            }
        }

        // 4. Prepare: joints in insertion order, then contacts in
        // enumeration order.
        for joint in &mut self.joints {
            joint.prepare(&mut self.bodies, &self.settings, h);
        }
        for contact in &mut self.contacts {
            contact.prepare(&mut self.bodies, &self.settings, h);
        }

        // 5. Velocity iterations in the same order.
        for _ in 0..self.settings.velocity_iterations {
            for joint in &mut self.joints {
                joint.solve(&mut self.bodies, &self.settings);
            }
            for contact in &mut self.contacts {
                contact.solve(&mut self.bodies);
            }
        }

        // 6. Save accumulated impulses for the next tick. Contacts are
        // built with body_a < body_b, so the pair is already canonical.
        self.warm_cache.clear();
        for contact in &self.contacts {
            for p in &contact.points {
                self.warm_cache.insert(
                    (contact.body_a, contact.body_b, p.feature),
                    (p.normal_impulse, p.tangent_impulse),
                );
            }
        }

        // 7. Velocities into poses.
        for body in self.bodies.iter_mut().flatten() {
            body.integrate_pose(h);
        }
    }
}
