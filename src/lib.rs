//! Intersection Simulation Library
//!
//! A discrete-time simulation of traffic through one signalized intersection,
//! runnable headless or drawn in the terminal.

pub mod render;
pub mod simulation;
