//! Error types and handling
//!
//! This module contains the error type shared by the engine, the hospital
//! model and the study harness.

use thiserror::Error;

use crate::types::{ConfigError, ConfigValidationError};

/// Errors that can occur during simulation
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ConfigurationError(String),

    /// An event could not be scheduled
    #[error("Scheduling error: {0}")]
    SchedulingError(String),

    /// A resource pool was used inconsistently
    #[error("Resource error: {0}")]
    ResourceError(String),

    /// A patient process was resumed in a state it cannot continue from
    #[error("Patient process error: {0}")]
    ProcessError(String),

    /// A sampling distribution could not be built
    #[error("Distribution error: {0}")]
    DistributionError(String),

    /// I/O error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Statistics error
    #[error("Statistics error: {0}")]
    StatisticsError(String),
}

impl From<ConfigValidationError> for SimulationError {
    fn from(error: ConfigValidationError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl From<ConfigError> for SimulationError {
    fn from(error: ConfigError) -> Self {
        SimulationError::ConfigurationError(error.to_string())
    }
}

impl SimulationError {
    /// Create a configuration error
    pub fn configuration_error(msg: impl Into<String>) -> Self {
        Self::ConfigurationError(msg.into())
    }

    /// Create a scheduling error
    pub fn scheduling_error(msg: impl Into<String>) -> Self {
        Self::SchedulingError(msg.into())
    }

    /// Create a resource error
    pub fn resource_error(msg: impl Into<String>) -> Self {
        Self::ResourceError(msg.into())
    }

    /// Create a patient process error
    pub fn process_error(msg: impl Into<String>) -> Self {
        Self::ProcessError(msg.into())
    }

    /// Create a distribution error
    pub fn distribution_error(msg: impl Into<String>) -> Self {
        Self::DistributionError(msg.into())
    }

    /// Create a statistics error
    pub fn statistics_error(msg: impl Into<String>) -> Self {
        Self::StatisticsError(msg.into())
    }

    /// Get the error category
    pub fn category(&self) -> &'static str {
        match self {
            SimulationError::ConfigurationError(_) => "Configuration",
            SimulationError::SchedulingError(_) => "Scheduling",
            SimulationError::ResourceError(_) => "Resource",
            SimulationError::ProcessError(_) => "Patient Process",
            SimulationError::DistributionError(_) => "Distribution",
            SimulationError::IoError(_) => "IO",
            SimulationError::SerializationError(_) => "Serialization",
            SimulationError::StatisticsError(_) => "Statistics",
        }
    }
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_error_creation() {
        let config_error = SimulationError::configuration_error("Invalid config");
        assert!(matches!(config_error, SimulationError::ConfigurationError(_)));
        assert_eq!(config_error.to_string(), "Configuration validation failed: Invalid config");

        let resource_error = SimulationError::resource_error("ticket not held");
        assert!(matches!(resource_error, SimulationError::ResourceError(_)));
        assert_eq!(resource_error.to_string(), "Resource error: ticket not held");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let sim_error: SimulationError = io_error.into();
        assert!(matches!(sim_error, SimulationError::IoError(_)));
    }

    #[test]
    fn test_error_from_validation_error() {
        let validation = ConfigValidationError::InvalidReplicationCount(0);
        let sim_error: SimulationError = validation.into();
        assert!(matches!(sim_error, SimulationError::ConfigurationError(_)));
        assert_eq!(sim_error.category(), "Configuration");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(SimulationError::scheduling_error("x").category(), "Scheduling");
        assert_eq!(SimulationError::resource_error("x").category(), "Resource");
        assert_eq!(SimulationError::process_error("x").category(), "Patient Process");
        assert_eq!(SimulationError::distribution_error("x").category(), "Distribution");
        assert_eq!(SimulationError::statistics_error("x").category(), "Statistics");
    }

    #[test]
    fn test_simulation_result_type() {
        let success: SimulationResult<i32> = Ok(42);
        assert!(success.is_ok());

        let failure: SimulationResult<i32> = Err(SimulationError::configuration_error("Test"));
        assert!(failure.is_err());
    }
}
