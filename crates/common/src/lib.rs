//! Shared types for the ATS bridge services

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
