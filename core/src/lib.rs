//! Planar core: a 2D rigid-body physics engine.
//!
//! The crate provides the three pieces a simulation loop needs: a
//! dynamic AABB tree for the broad phase, a sequential-impulse
//! constraint solver covering contacts and user joints, and the
//! fixed-timestep [`world::World`] that wires them together.

pub mod aabb;
pub mod body;
pub mod contact;
pub mod error;
pub mod joints;
pub mod math;
pub mod narrowphase;
pub mod shapes;
pub mod tree;
pub mod world;
