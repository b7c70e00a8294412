//! Core types and utilities for the gridsim lattice simulation engine.

pub mod types;
pub mod config;
pub mod error;
pub mod record;
pub mod stats;

pub use error::{Error, Result};
pub use types::*;
pub use config::*;
pub use record::*;
pub use stats::*;
