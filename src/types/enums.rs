//! Enumeration types for the surgical flow simulator
//!
//! This module contains the enumeration types shared across the simulation:
//! resource pool kinds, output formats and predefined scenarios.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The three finite-capacity stages a patient passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoolKind {
    /// Preparation rooms
    Preparation,
    /// Operating theatres
    Theatre,
    /// Recovery beds
    Recovery,
}

impl PoolKind {
    /// All pool kinds in patient flow order
    pub const ALL: [PoolKind; 3] = [PoolKind::Preparation, PoolKind::Theatre, PoolKind::Recovery];

    /// Short name used in metric column names (`mean_{prefix}_queue`)
    pub fn metric_prefix(self) -> &'static str {
        match self {
            PoolKind::Preparation => "prep",
            PoolKind::Theatre => "theatre",
            PoolKind::Recovery => "recovery",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolKind::Preparation => write!(f, "Preparation"),
            PoolKind::Theatre => write!(f, "Theatre"),
            PoolKind::Recovery => write!(f, "Recovery"),
        }
    }
}

impl FromStr for PoolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prep" | "preparation" => Ok(PoolKind::Preparation),
            "theatre" | "theater" | "operation" => Ok(PoolKind::Theatre),
            "recovery" => Ok(PoolKind::Recovery),
            _ => Err(format!("Unknown pool kind: {}", s)),
        }
    }
}

/// Output format options for the replication table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// JSON format for structured data
    Json,
    /// CSV format for tabular data
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::Csv => write!(f, "CSV"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Predefined experiment scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioPreset {
    /// Three prep rooms, one theatre, three recovery beds
    Baseline,
    /// Baseline with a single recovery bed
    Recovery1,
    /// Baseline with two recovery beds
    Recovery2,
    /// Baseline with four recovery beds
    Recovery4,
    /// Baseline with a mean interarrival of 15 minutes
    HighLoad,
    /// Baseline with a mean interarrival of 40 minutes
    LowLoad,
}

impl fmt::Display for ScenarioPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioPreset::Baseline => write!(f, "baseline"),
            ScenarioPreset::Recovery1 => write!(f, "recovery-1"),
            ScenarioPreset::Recovery2 => write!(f, "recovery-2"),
            ScenarioPreset::Recovery4 => write!(f, "recovery-4"),
            ScenarioPreset::HighLoad => write!(f, "high-load"),
            ScenarioPreset::LowLoad => write!(f, "low-load"),
        }
    }
}

impl FromStr for ScenarioPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "baseline" => Ok(ScenarioPreset::Baseline),
            "recovery-1" | "recovery1" => Ok(ScenarioPreset::Recovery1),
            "recovery-2" | "recovery2" => Ok(ScenarioPreset::Recovery2),
            "recovery-4" | "recovery4" => Ok(ScenarioPreset::Recovery4),
            "high-load" | "highload" => Ok(ScenarioPreset::HighLoad),
            "low-load" | "lowload" => Ok(ScenarioPreset::LowLoad),
            _ => Err(format!("Unknown scenario preset: {}", s)),
        }
    }
}
