//! Application layer - Services that drive the ports.

pub mod bridge;
pub mod controller;
pub mod events;
pub mod seed;

#[cfg(test)]
mod functional_tests;
