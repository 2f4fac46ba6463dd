//! Deployment pipeline

pub mod builder;
pub mod env;
pub mod executor;
pub mod fsm;
pub mod overlay;
pub mod resolver;
