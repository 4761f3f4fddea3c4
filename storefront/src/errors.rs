use crate::config::ValidationError;
use std::io;

/// Errors that stop the storefront from starting or serving
#[derive(thiserror::Error, Debug)]
pub enum StorefrontError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}
