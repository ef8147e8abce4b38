//! Physics-driven movement.

pub mod controller;
