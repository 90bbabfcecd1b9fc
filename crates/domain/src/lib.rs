//! Shared configuration model and error type for the resource node crates.

pub mod config;
pub mod error;

pub use error::{Error, Result};
