//! Step runtime options

use crate::deploy::fsm::RetryPolicy;
use crate::logs::LogOptions;

/// Runtime options of the deployment step
#[derive(Debug, Clone, Default)]
pub struct StepOptions {
    /// Conflict retry settings
    pub retry: RetryPolicy,

    /// Logging configuration
    pub log: LogOptions,
}
