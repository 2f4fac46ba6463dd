//! Marathon REST API models
//!
//! Wire types shared between the deployer and its tests.

pub mod models;

pub use models::*;
