//! Model scoring
//!
//! [`ScoringService`] is the `init` / `run` entry point a hosting runtime
//! calls: load the registered model once, then answer JSON requests.

mod config;
mod service;

pub use config::{ScoringConfig, DEFAULT_MODEL_NAME};
pub use service::ScoringService;
