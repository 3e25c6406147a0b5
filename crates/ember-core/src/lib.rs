//! Ember Core - Core types and utilities for the Ember combat engine
//!
//! This crate provides the foundational types used throughout the engine:
//! - Mathematical primitives (re-exported from glam)
//! - Entity identifiers and transforms for positioning combatants
//! - Fixed-timestep game clock that drives the simulation scheduler

pub mod time;
pub mod types;

pub use glam::{Quat, Vec3};
pub use time::{GameTime, TimeConfig};
pub use types::{EntityId, Transform};
