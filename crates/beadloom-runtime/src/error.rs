#![forbid(unsafe_code)]

use beadloom_core::{ModelError, PayloadError};
use thiserror::Error;

use crate::config::ConfigError;

/// A store operation the caller must be told was rejected. State is left
/// unchanged whenever one of these is returned.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid import: {0}")]
    Payload(#[from] PayloadError),
    #[error("invalid bead: {0}")]
    Model(#[from] ModelError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
