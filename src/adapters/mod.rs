//! Adapters - Concrete implementations of ports.

#[cfg(feature = "gemini")]
pub mod gemini;

pub mod local;
