//! Core types and configuration for the cellsim artificial-life engine.

pub mod types;
pub mod config;
pub mod error;
pub mod params;
pub mod stats;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use params::Parameter;
pub use stats::*;
