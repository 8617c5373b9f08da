//! Ports - Trait definitions for the collaborators the workflow drives.

pub mod credentials;
pub mod display;
pub mod generator;
