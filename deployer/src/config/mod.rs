//! Step configuration

pub mod settings;
pub mod validate;
