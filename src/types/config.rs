//! Configuration structures for the surgical flow simulator
//!
//! This module contains the simulation configuration value, its builder and
//! single-field override type, file/CLI loading and validation logic.

use super::{PoolKind, ScenarioPreset};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Command line arguments structure
#[derive(Debug, Clone, Parser)]
#[command(
    name = "surgical-flow-sim",
    version = "0.1.0",
    about = "Surgical Flow Simulator - replicated discrete-event simulation of a surgical unit",
    long_about = "Simulates patients flowing through preparation, operation and recovery with finite capacities. When every recovery bed is occupied, a patient whose operation has finished keeps the operating theatre blocked until a bed frees up. Runs many independent seeded replications and reports means with 95% confidence intervals.

EXAMPLES:
    # Run the baseline study with default settings
    surgical-flow-sim

    # Use a configuration file
    surgical-flow-sim --config config.json

    # Run a predefined scenario with overrides
    surgical-flow-sim --scenario high-load --num-replications 50

    # Compare against a variant with 5 recovery rooms (common random numbers)
    surgical-flow-sim --compare-recovery-rooms 5

    # Write the per-replication table
    surgical-flow-sim --output results.csv --output-format csv

    # Generate configuration template
    surgical-flow-sim --print-config > my-config.json

    # Validate configuration without running
    surgical-flow-sim --config my-config.json --dry-run

CONFIGURATION:
    Configuration can be provided via:
    1. Command line arguments (highest priority)
    2. Configuration file (--config flag)
    3. Scenario preset (--scenario flag)
    4. Default values (lowest priority)

    Supported configuration file formats: JSON (.json)"
)]
pub struct CliArgs {
    /// Configuration file path (JSON format)
    #[arg(
        short,
        long,
        help = "Configuration file path (JSON format)",
        long_help = "Path to a JSON configuration file. CLI arguments will override file settings."
    )]
    pub config: Option<String>,

    /// Predefined scenario to start from
    #[arg(
        long,
        help = "Scenario preset (baseline, recovery-1, recovery-2, recovery-4, high-load, low-load)"
    )]
    pub scenario: Option<String>,

    /// Number of preparation rooms
    #[arg(long, help = "Number of preparation rooms")]
    pub num_prep_rooms: Option<usize>,

    /// Number of operating theatres
    #[arg(long, help = "Number of operating theatres")]
    pub num_operating_theatres: Option<usize>,

    /// Number of recovery rooms
    #[arg(long, help = "Number of recovery rooms")]
    pub num_recovery_rooms: Option<usize>,

    /// Mean interarrival time in minutes
    #[arg(long, help = "Mean interarrival time (minutes)")]
    pub mean_interarrival: Option<f64>,

    /// Mean preparation time in minutes
    #[arg(long, help = "Mean preparation time (minutes)")]
    pub mean_prep_time: Option<f64>,

    /// Mean operation time in minutes
    #[arg(long, help = "Mean operation time (minutes)")]
    pub mean_operation_time: Option<f64>,

    /// Mean recovery time in minutes
    #[arg(long, help = "Mean recovery time (minutes)")]
    pub mean_recovery_time: Option<f64>,

    /// Simulated duration of each replication in minutes
    #[arg(long, help = "Simulated duration per replication (minutes)")]
    pub sim_duration: Option<f64>,

    /// Warmup period in minutes
    #[arg(long, help = "Warmup period excluded from statistics (minutes)")]
    pub warmup_period: Option<f64>,

    /// Number of independent replications
    #[arg(long, help = "Number of independent replications")]
    pub num_replications: Option<usize>,

    /// Base random seed
    #[arg(
        long,
        help = "Base random seed",
        long_help = "Base random seed. Replication i is seeded with seed + i, so runs are reproducible."
    )]
    pub random_seed: Option<u64>,

    /// Monitoring interval in minutes
    #[arg(long, help = "Pool sampling interval (minutes)")]
    pub monitoring_interval: Option<f64>,

    /// Output path for the per-replication table
    #[arg(long, help = "Output path for the per-replication metrics table")]
    pub output: Option<String>,

    /// Output format for the per-replication table
    #[arg(
        long,
        default_value = "csv",
        help = "Output format (json or csv)",
        long_help = "Output format for the per-replication table. Supported formats: json, csv. Default: csv"
    )]
    pub output_format: String,

    /// Output path for the aggregate summary
    #[arg(long, help = "Output path for the aggregate summary JSON file")]
    pub summary_output: Option<String>,

    /// Output path for the patient-level table
    #[arg(long, help = "Output path for the patient-level CSV table")]
    pub patients_output: Option<String>,

    /// Run a paired comparison against this number of recovery rooms
    #[arg(
        long,
        help = "Paired comparison against a variant with N recovery rooms",
        long_help = "Runs the configured scenario and a copy with N recovery rooms using common random numbers, then reports per-metric differences with 95% confidence intervals."
    )]
    pub compare_recovery_rooms: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(short, long, help = "Enable debug logging")]
    pub debug: bool,

    /// Dry run mode - validate configuration without running simulation
    #[arg(long, help = "Validate configuration without running simulation")]
    pub dry_run: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in JSON format and exit")]
    pub print_config: bool,
}

/// Configuration file structure (allows partial configuration)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Number of preparation rooms
    pub num_prep_rooms: Option<usize>,
    /// Number of operating theatres
    pub num_operating_theatres: Option<usize>,
    /// Number of recovery rooms
    pub num_recovery_rooms: Option<usize>,
    /// Mean interarrival time (minutes)
    pub mean_interarrival: Option<f64>,
    /// Mean preparation time (minutes)
    pub mean_prep_time: Option<f64>,
    /// Mean operation time (minutes)
    pub mean_operation_time: Option<f64>,
    /// Mean recovery time (minutes)
    pub mean_recovery_time: Option<f64>,
    /// Simulated duration per replication (minutes)
    pub sim_duration: Option<f64>,
    /// Warmup period (minutes)
    pub warmup_period: Option<f64>,
    /// Number of replications
    pub num_replications: Option<usize>,
    /// Base random seed
    pub random_seed: Option<u64>,
    /// Monitoring interval (minutes)
    pub monitoring_interval: Option<f64>,
}

impl ConfigFile {
    /// Merge the fields present in the file over `base`
    pub fn merge_over(self, base: SimulationConfig) -> SimulationConfig {
        SimulationConfig {
            num_prep_rooms: self.num_prep_rooms.unwrap_or(base.num_prep_rooms),
            num_operating_theatres: self
                .num_operating_theatres
                .unwrap_or(base.num_operating_theatres),
            num_recovery_rooms: self.num_recovery_rooms.unwrap_or(base.num_recovery_rooms),
            mean_interarrival: self.mean_interarrival.unwrap_or(base.mean_interarrival),
            mean_prep_time: self.mean_prep_time.unwrap_or(base.mean_prep_time),
            mean_operation_time: self.mean_operation_time.unwrap_or(base.mean_operation_time),
            mean_recovery_time: self.mean_recovery_time.unwrap_or(base.mean_recovery_time),
            sim_duration: self.sim_duration.unwrap_or(base.sim_duration),
            warmup_period: self.warmup_period.unwrap_or(base.warmup_period),
            num_replications: self.num_replications.unwrap_or(base.num_replications),
            random_seed: self.random_seed.unwrap_or(base.random_seed),
            monitoring_interval: self.monitoring_interval.unwrap_or(base.monitoring_interval),
        }
    }
}

/// Configuration for the surgical unit simulation.
///
/// All times are in simulated minutes. The value is immutable once built:
/// variants are derived with [`SimulationConfig::with_override`] or the
/// [`SimulationConfigBuilder`], never by mutating a shared template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of preparation rooms
    pub num_prep_rooms: usize,
    /// Number of operating theatres
    pub num_operating_theatres: usize,
    /// Number of recovery rooms
    pub num_recovery_rooms: usize,
    /// Mean of the exponential interarrival distribution
    pub mean_interarrival: f64,
    /// Mean of the exponential preparation time distribution
    pub mean_prep_time: f64,
    /// Mean of the exponential operation time distribution
    pub mean_operation_time: f64,
    /// Mean of the exponential recovery time distribution
    pub mean_recovery_time: f64,
    /// Simulated horizon of each replication
    pub sim_duration: f64,
    /// Initial interval whose departures are excluded from statistics
    pub warmup_period: f64,
    /// Number of independent replications in a study
    pub num_replications: usize,
    /// Base seed; replication `i` uses `random_seed + i`
    pub random_seed: u64,
    /// Interval between pool occupancy samples
    pub monitoring_interval: f64,
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    /// Configuration file read error
    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    /// JSON parsing error
    #[error("Failed to parse JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Unsupported configuration file format
    #[error("Unsupported configuration file format: {0} (supported: .json)")]
    UnsupportedFormat(String),

    /// Unknown scenario preset name
    #[error("Unknown scenario preset: {0}")]
    UnknownScenario(String),
}

/// Validation errors for simulation configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigValidationError {
    /// A pool was configured with no slots
    #[error("{pool} capacity must be greater than 0, got {value}")]
    InvalidCapacity {
        /// Pool with the invalid capacity
        pool: PoolKind,
        /// The rejected capacity
        value: usize,
    },

    /// A distribution mean is not a positive finite number
    #[error("Invalid mean for {field}: {value} (must be a positive number of minutes)")]
    InvalidMean {
        /// Name of the field with the invalid mean
        field: String,
        /// The rejected value
        value: f64,
    },

    /// Replication count is invalid
    #[error("Number of replications must be greater than 0, got {0}")]
    InvalidReplicationCount(usize),

    /// Simulation duration is invalid
    #[error("Simulation duration must be a positive number of minutes, got {0}")]
    InvalidDuration(f64),

    /// Warmup is negative or does not leave any observation window
    #[error("Warmup period {warmup} must be >= 0 and shorter than the simulation duration {duration}")]
    InvalidWarmup {
        /// The rejected warmup period
        warmup: f64,
        /// The configured simulation duration
        duration: f64,
    },

    /// Monitoring interval is invalid
    #[error("Monitoring interval must be a positive number of minutes, got {0}")]
    InvalidMonitoringInterval(f64),
}

/// A single named configuration change.
///
/// Used by sensitivity analysis and scenario construction so that every
/// variant states exactly which field differs from its base.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConfigOverride {
    /// Set the number of preparation rooms
    PrepRooms(usize),
    /// Set the number of operating theatres
    OperatingTheatres(usize),
    /// Set the number of recovery rooms
    RecoveryRooms(usize),
    /// Set the mean interarrival time
    MeanInterarrival(f64),
    /// Set the mean preparation time
    MeanPrepTime(f64),
    /// Set the mean operation time
    MeanOperationTime(f64),
    /// Set the mean recovery time
    MeanRecoveryTime(f64),
    /// Set the simulated duration
    SimDuration(f64),
    /// Set the warmup period
    WarmupPeriod(f64),
    /// Set the number of replications
    Replications(usize),
    /// Set the base random seed
    RandomSeed(u64),
    /// Set the monitoring interval
    MonitoringInterval(f64),
}

impl ConfigOverride {
    /// Name of the configuration field this override changes
    pub fn field_name(&self) -> &'static str {
        match self {
            ConfigOverride::PrepRooms(_) => "num_prep_rooms",
            ConfigOverride::OperatingTheatres(_) => "num_operating_theatres",
            ConfigOverride::RecoveryRooms(_) => "num_recovery_rooms",
            ConfigOverride::MeanInterarrival(_) => "mean_interarrival",
            ConfigOverride::MeanPrepTime(_) => "mean_prep_time",
            ConfigOverride::MeanOperationTime(_) => "mean_operation_time",
            ConfigOverride::MeanRecoveryTime(_) => "mean_recovery_time",
            ConfigOverride::SimDuration(_) => "sim_duration",
            ConfigOverride::WarmupPeriod(_) => "warmup_period",
            ConfigOverride::Replications(_) => "num_replications",
            ConfigOverride::RandomSeed(_) => "random_seed",
            ConfigOverride::MonitoringInterval(_) => "monitoring_interval",
        }
    }
}

impl fmt::Display for ConfigOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOverride::PrepRooms(v)
            | ConfigOverride::OperatingTheatres(v)
            | ConfigOverride::RecoveryRooms(v)
            | ConfigOverride::Replications(v) => write!(f, "{}={}", self.field_name(), v),
            ConfigOverride::RandomSeed(v) => write!(f, "{}={}", self.field_name(), v),
            ConfigOverride::MeanInterarrival(v)
            | ConfigOverride::MeanPrepTime(v)
            | ConfigOverride::MeanOperationTime(v)
            | ConfigOverride::MeanRecoveryTime(v)
            | ConfigOverride::SimDuration(v)
            | ConfigOverride::WarmupPeriod(v)
            | ConfigOverride::MonitoringInterval(v) => write!(f, "{}={}", self.field_name(), v),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            num_prep_rooms: 3,
            num_operating_theatres: 1,
            num_recovery_rooms: 3,
            mean_interarrival: 25.0,
            mean_prep_time: 40.0,
            mean_operation_time: 20.0,
            mean_recovery_time: 40.0,
            sim_duration: 24.0 * 60.0,
            warmup_period: 8.0 * 60.0,
            num_replications: 30,
            random_seed: 42,
            monitoring_interval: 60.0,
        }
    }
}

impl SimulationConfig {
    /// Start building a configuration from the baseline defaults
    pub fn builder() -> SimulationConfigBuilder {
        SimulationConfigBuilder::new()
    }

    /// Configuration for a predefined scenario
    pub fn from_preset(preset: ScenarioPreset) -> Self {
        let base = Self::default();
        match preset {
            ScenarioPreset::Baseline => base,
            ScenarioPreset::Recovery1 => Self { num_recovery_rooms: 1, ..base },
            ScenarioPreset::Recovery2 => Self { num_recovery_rooms: 2, ..base },
            ScenarioPreset::Recovery4 => Self { num_recovery_rooms: 4, ..base },
            ScenarioPreset::HighLoad => Self { mean_interarrival: 15.0, ..base },
            ScenarioPreset::LowLoad => Self { mean_interarrival: 40.0, ..base },
        }
    }

    /// Create a new configuration from command line arguments and optional config file
    pub fn from_args() -> Result<Self, ConfigError> {
        let args = CliArgs::parse();
        Self::from_cli_args(args)
    }

    /// Create configuration from parsed CLI arguments
    pub fn from_cli_args(args: CliArgs) -> Result<Self, ConfigError> {
        // Start with the preset (or baseline defaults)
        let mut config = match &args.scenario {
            Some(name) => {
                let preset = name
                    .parse::<ScenarioPreset>()
                    .map_err(|_| ConfigError::UnknownScenario(name.clone()))?;
                Self::from_preset(preset)
            }
            None => Self::default(),
        };

        // Layer the config file over it if specified
        if let Some(config_path) = &args.config {
            config = Self::read_config_file(config_path)?.merge_over(config);
        }

        // Override with command line arguments (CLI takes precedence)
        Self::apply_cli_overrides(&mut config, &args);

        Ok(config)
    }

    /// Load configuration from a JSON file, merging with defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Ok(Self::read_config_file(path)?.merge_over(Self::default()))
    }

    fn read_config_file<P: AsRef<Path>>(path: P) -> Result<ConfigFile, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => {
                let content = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&content)?)
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(config: &mut Self, args: &CliArgs) {
        if let Some(value) = args.num_prep_rooms {
            config.num_prep_rooms = value;
        }
        if let Some(value) = args.num_operating_theatres {
            config.num_operating_theatres = value;
        }
        if let Some(value) = args.num_recovery_rooms {
            config.num_recovery_rooms = value;
        }
        if let Some(value) = args.mean_interarrival {
            config.mean_interarrival = value;
        }
        if let Some(value) = args.mean_prep_time {
            config.mean_prep_time = value;
        }
        if let Some(value) = args.mean_operation_time {
            config.mean_operation_time = value;
        }
        if let Some(value) = args.mean_recovery_time {
            config.mean_recovery_time = value;
        }
        if let Some(value) = args.sim_duration {
            config.sim_duration = value;
        }
        if let Some(value) = args.warmup_period {
            config.warmup_period = value;
        }
        if let Some(value) = args.num_replications {
            config.num_replications = value;
        }
        if let Some(value) = args.random_seed {
            config.random_seed = value;
        }
        if let Some(value) = args.monitoring_interval {
            config.monitoring_interval = value;
        }
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Print configuration as JSON
    pub fn print_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Return a validated copy with one field changed
    pub fn with_override(&self, change: ConfigOverride) -> Result<Self, ConfigValidationError> {
        let builder = SimulationConfigBuilder { config: self.clone() };
        let builder = match change {
            ConfigOverride::PrepRooms(v) => builder.num_prep_rooms(v),
            ConfigOverride::OperatingTheatres(v) => builder.num_operating_theatres(v),
            ConfigOverride::RecoveryRooms(v) => builder.num_recovery_rooms(v),
            ConfigOverride::MeanInterarrival(v) => builder.mean_interarrival(v),
            ConfigOverride::MeanPrepTime(v) => builder.mean_prep_time(v),
            ConfigOverride::MeanOperationTime(v) => builder.mean_operation_time(v),
            ConfigOverride::MeanRecoveryTime(v) => builder.mean_recovery_time(v),
            ConfigOverride::SimDuration(v) => builder.sim_duration(v),
            ConfigOverride::WarmupPeriod(v) => builder.warmup_period(v),
            ConfigOverride::Replications(v) => builder.num_replications(v),
            ConfigOverride::RandomSeed(v) => builder.random_seed(v),
            ConfigOverride::MonitoringInterval(v) => builder.monitoring_interval(v),
        };
        builder.build()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (pool, value) in [
            (PoolKind::Preparation, self.num_prep_rooms),
            (PoolKind::Theatre, self.num_operating_theatres),
            (PoolKind::Recovery, self.num_recovery_rooms),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::InvalidCapacity { pool, value });
            }
        }

        self.validate_mean("mean_interarrival", self.mean_interarrival)?;
        self.validate_mean("mean_prep_time", self.mean_prep_time)?;
        self.validate_mean("mean_operation_time", self.mean_operation_time)?;
        self.validate_mean("mean_recovery_time", self.mean_recovery_time)?;

        if self.num_replications == 0 {
            return Err(ConfigValidationError::InvalidReplicationCount(self.num_replications));
        }

        if !(self.sim_duration.is_finite() && self.sim_duration > 0.0) {
            return Err(ConfigValidationError::InvalidDuration(self.sim_duration));
        }

        if !(self.warmup_period.is_finite()
            && self.warmup_period >= 0.0
            && self.warmup_period < self.sim_duration)
        {
            return Err(ConfigValidationError::InvalidWarmup {
                warmup: self.warmup_period,
                duration: self.sim_duration,
            });
        }

        if !(self.monitoring_interval.is_finite() && self.monitoring_interval > 0.0) {
            return Err(ConfigValidationError::InvalidMonitoringInterval(self.monitoring_interval));
        }

        Ok(())
    }

    fn validate_mean(&self, field: &str, value: f64) -> Result<(), ConfigValidationError> {
        if !(value.is_finite() && value > 0.0) {
            return Err(ConfigValidationError::InvalidMean { field: field.to_string(), value });
        }
        Ok(())
    }

    /// Descriptive scenario name, e.g. `P3_T1_R3`
    pub fn scenario_name(&self) -> String {
        format!(
            "P{}_T{}_R{}",
            self.num_prep_rooms, self.num_operating_theatres, self.num_recovery_rooms
        )
    }

    /// Length of the post-warmup observation window
    pub fn observation_window(&self) -> f64 {
        self.sim_duration - self.warmup_period
    }

    /// Seed used by replication `index`
    pub fn seed_for(&self, index: usize) -> u64 {
        self.random_seed.wrapping_add(index as u64)
    }

    /// Capacity configured for a pool
    pub fn capacity_of(&self, pool: PoolKind) -> usize {
        match pool {
            PoolKind::Preparation => self.num_prep_rooms,
            PoolKind::Theatre => self.num_operating_theatres,
            PoolKind::Recovery => self.num_recovery_rooms,
        }
    }
}

/// Builder naming every configuration field explicitly
#[derive(Debug, Clone)]
pub struct SimulationConfigBuilder {
    config: SimulationConfig,
}

impl SimulationConfigBuilder {
    /// Create a builder seeded with the baseline defaults
    pub fn new() -> Self {
        Self { config: SimulationConfig::default() }
    }

    /// Start from an existing configuration
    pub fn from_config(config: SimulationConfig) -> Self {
        Self { config }
    }

    /// Set the number of preparation rooms
    pub fn num_prep_rooms(mut self, value: usize) -> Self {
        self.config.num_prep_rooms = value;
        self
    }

    /// Set the number of operating theatres
    pub fn num_operating_theatres(mut self, value: usize) -> Self {
        self.config.num_operating_theatres = value;
        self
    }

    /// Set the number of recovery rooms
    pub fn num_recovery_rooms(mut self, value: usize) -> Self {
        self.config.num_recovery_rooms = value;
        self
    }

    /// Set the mean interarrival time
    pub fn mean_interarrival(mut self, value: f64) -> Self {
        self.config.mean_interarrival = value;
        self
    }

    /// Set the mean preparation time
    pub fn mean_prep_time(mut self, value: f64) -> Self {
        self.config.mean_prep_time = value;
        self
    }

    /// Set the mean operation time
    pub fn mean_operation_time(mut self, value: f64) -> Self {
        self.config.mean_operation_time = value;
        self
    }

    /// Set the mean recovery time
    pub fn mean_recovery_time(mut self, value: f64) -> Self {
        self.config.mean_recovery_time = value;
        self
    }

    /// Set the simulated duration
    pub fn sim_duration(mut self, value: f64) -> Self {
        self.config.sim_duration = value;
        self
    }

    /// Set the warmup period
    pub fn warmup_period(mut self, value: f64) -> Self {
        self.config.warmup_period = value;
        self
    }

    /// Set the number of replications
    pub fn num_replications(mut self, value: usize) -> Self {
        self.config.num_replications = value;
        self
    }

    /// Set the base random seed
    pub fn random_seed(mut self, value: u64) -> Self {
        self.config.random_seed = value;
        self
    }

    /// Set the monitoring interval
    pub fn monitoring_interval(mut self, value: f64) -> Self {
        self.config.monitoring_interval = value;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<SimulationConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for SimulationConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_args() -> CliArgs {
        CliArgs::try_parse_from(["test"]).unwrap()
    }

    #[test]
    fn test_simulation_config_default() {
        let config = SimulationConfig::default();

        assert_eq!(config.num_prep_rooms, 3);
        assert_eq!(config.num_operating_theatres, 1);
        assert_eq!(config.num_recovery_rooms, 3);
        assert_eq!(config.mean_interarrival, 25.0);
        assert_eq!(config.sim_duration, 1440.0);
        assert_eq!(config.warmup_period, 480.0);
        assert_eq!(config.num_replications, 30);
        assert_eq!(config.random_seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_name() {
        assert_eq!(SimulationConfig::default().scenario_name(), "P3_T1_R3");
        let config = SimulationConfig::from_preset(ScenarioPreset::Recovery1);
        assert_eq!(config.scenario_name(), "P3_T1_R1");
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let result = SimulationConfig::builder().num_recovery_rooms(0).build();
        assert_eq!(
            result.unwrap_err(),
            ConfigValidationError::InvalidCapacity { pool: PoolKind::Recovery, value: 0 }
        );
    }

    #[test]
    fn test_validation_rejects_non_positive_means() {
        let result = SimulationConfig::builder().mean_operation_time(0.0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidMean { .. })));

        let result = SimulationConfig::builder().mean_interarrival(-3.0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidMean { .. })));

        let result = SimulationConfig::builder().mean_prep_time(f64::NAN).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidMean { .. })));
    }

    #[test]
    fn test_validation_rejects_zero_replications() {
        let result = SimulationConfig::builder().num_replications(0).build();
        assert_eq!(result.unwrap_err(), ConfigValidationError::InvalidReplicationCount(0));
    }

    #[test]
    fn test_validation_rejects_bad_time_window() {
        let result = SimulationConfig::builder().sim_duration(0.0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidDuration(_))));

        let result = SimulationConfig::builder().warmup_period(1440.0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidWarmup { .. })));

        let result = SimulationConfig::builder().monitoring_interval(0.0).build();
        assert!(matches!(result, Err(ConfigValidationError::InvalidMonitoringInterval(_))));
    }

    #[test]
    fn test_with_override_changes_only_named_field() {
        let base = SimulationConfig::default();
        let variant = base.with_override(ConfigOverride::RecoveryRooms(5)).unwrap();

        assert_eq!(variant.num_recovery_rooms, 5);
        assert_eq!(SimulationConfig { num_recovery_rooms: 3, ..variant.clone() }, base);
        assert_eq!(base.num_recovery_rooms, 3);
    }

    #[test]
    fn test_with_override_validates() {
        let base = SimulationConfig::default();
        assert!(base.with_override(ConfigOverride::OperatingTheatres(0)).is_err());
    }

    #[test]
    fn test_override_display() {
        assert_eq!(ConfigOverride::RecoveryRooms(2).to_string(), "num_recovery_rooms=2");
        assert_eq!(ConfigOverride::MeanInterarrival(15.0).to_string(), "mean_interarrival=15");
    }

    #[test]
    fn test_seed_for_replication() {
        let config = SimulationConfig::default();
        assert_eq!(config.seed_for(0), 42);
        assert_eq!(config.seed_for(7), 49);
    }

    #[test]
    fn test_config_file_loading() {
        use std::io::Write;
        use tempfile::Builder;

        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(temp_file, r#"{{ "num_recovery_rooms": 5, "mean_interarrival": 30.0 }}"#).unwrap();

        let config = SimulationConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.num_recovery_rooms, 5);
        assert_eq!(config.mean_interarrival, 30.0);
        // Unspecified fields fall back to defaults
        assert_eq!(config.num_prep_rooms, 3);
    }

    #[test]
    fn test_config_file_errors() {
        assert!(matches!(
            SimulationConfig::from_file("/definitely/not/here.json"),
            Err(ConfigError::FileNotFound(_))
        ));

        let temp_file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        assert!(matches!(
            SimulationConfig::from_file(temp_file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_cli_overrides() {
        let args = CliArgs::try_parse_from([
            "test",
            "--scenario",
            "high-load",
            "--num-recovery-rooms",
            "2",
            "--random-seed",
            "7",
        ])
        .unwrap();

        let config = SimulationConfig::from_cli_args(args).unwrap();
        assert_eq!(config.mean_interarrival, 15.0);
        assert_eq!(config.num_recovery_rooms, 2);
        assert_eq!(config.random_seed, 7);
    }

    #[test]
    fn test_cli_without_flags_uses_defaults() {
        let config = SimulationConfig::from_cli_args(empty_args()).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_cli_unknown_scenario() {
        let args = CliArgs::try_parse_from(["test", "--scenario", "weekend"]).unwrap();
        assert!(matches!(
            SimulationConfig::from_cli_args(args),
            Err(ConfigError::UnknownScenario(_))
        ));
    }

    #[test]
    fn test_simulation_config_serialization() {
        let config = SimulationConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: SimulationConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config, deserialized);
    }
}
