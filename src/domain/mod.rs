//! Domain layer - Pure business logic.

// Error text classification
pub mod classify;

// Dual binary/base64 media payloads
pub mod media;

// Request parameters per generation mode
pub mod params;

// Workflow states and generation outcomes
pub mod workflow;
