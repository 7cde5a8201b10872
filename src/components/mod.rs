//! Timer building blocks.
//!
//! Submodules overview:
//! - [`builder`] – factory parameters and restart parameters
//! - [`callbacks`] – callback slots and the panic-absorbing call helper
//! - [`owner`] – owner liveness gating
//! - [`policy`] – firing policies (delay, frame delay, loop, loop-until, loop-count)
//! - [`timer`] – the timer state machine

pub mod builder;
pub mod callbacks;
pub mod owner;
pub mod policy;
pub mod timer;
