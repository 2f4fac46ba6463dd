//! HTTP layer

pub mod client;
pub mod marathon;
