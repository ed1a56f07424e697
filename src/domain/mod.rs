//! Domain layer - Resource kinds, identifiers and port definitions
//!
//! This module defines the core traits (ports) that adapters implement,
//! following hexagonal architecture principles.

pub mod identifier;
pub mod ports;

pub use identifier::{build_id, parse_id, DELIMITER};
pub use ports::*;
