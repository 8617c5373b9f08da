//! Adapters that run entirely on the local machine.

pub mod display;
pub mod keyring;

pub use display::TempFileDisplay;
pub use keyring::{ApiKey, PromptCredentials};
