//! Marathon Deployer Library
//!
//! Renders a Marathon app definition from a build workspace and applies it,
//! retrying while the app is locked by another deployment.

pub mod app;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod utils;
