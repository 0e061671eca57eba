//! # tabrelay config
//!
//! Configuration management for the relay, the browser dispatcher and the
//! stdio protocol server.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
