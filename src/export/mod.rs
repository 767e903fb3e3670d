//! Model export module
//!
//! Provides the binary model artifact and a file-backed registry that
//! resolves model names to artifact paths.

mod artifact;
mod registry;

pub use artifact::{ModelArtifact, ModelMetadata};
pub use registry::{ModelRegistry, RegistryEntry};
