//! Build host integration

pub mod options;
pub mod step;
