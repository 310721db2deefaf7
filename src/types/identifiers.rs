//! Identifier types for the surgical flow simulator
//!
//! Patients are numbered with a per-replication monotonic counter so that two
//! runs with the same seed produce identical patient-level output. Studies are
//! tagged with a UUID so that output files and log lines can be correlated.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// Identifier of a patient within a single replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(u64);

impl PatientId {
    /// Wrap a raw counter value
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Return the raw counter value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PATIENT_{}", self.0)
    }
}

/// Monotonic patient id generator.
///
/// Owned by the arrival generator of one replication. A fresh generator is
/// created for every replication, so ids restart at 1 without any shared state.
#[derive(Debug, Clone)]
pub struct PatientIdGen {
    next: u64,
}

impl PatientIdGen {
    /// Create a generator whose first id is 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Mint the next patient id
    pub fn next_id(&mut self) -> PatientId {
        let id = PatientId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far
    pub fn issued(&self) -> u64 {
        self.next - 1
    }
}

impl Default for PatientIdGen {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a simulation study (a batch of replications)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StudyId(pub Uuid);

impl StudyId {
    /// Create a new random study ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StudyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StudyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "STUDY_{}", self.0.simple())
    }
}

impl Serialize for StudyId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("STUDY_{}", self.0.simple()))
    }
}

impl<'de> Deserialize<'de> for StudyId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let raw = s.strip_prefix("STUDY_").unwrap_or(&s);
        let uuid = Uuid::parse_str(raw).map_err(serde::de::Error::custom)?;
        Ok(StudyId(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patient_ids_start_at_one_and_increase() {
        let mut ids = PatientIdGen::new();
        assert_eq!(ids.next_id(), PatientId::new(1));
        assert_eq!(ids.next_id(), PatientId::new(2));
        assert_eq!(ids.issued(), 2);
    }

    #[test]
    fn test_fresh_generator_restarts_numbering() {
        let mut first = PatientIdGen::new();
        first.next_id();
        first.next_id();

        let mut second = PatientIdGen::new();
        assert_eq!(second.next_id().raw(), 1);
    }

    #[test]
    fn test_patient_id_display() {
        assert_eq!(PatientId::new(7).to_string(), "PATIENT_7");
    }

    #[test]
    fn test_study_id_serialization() {
        let id = StudyId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert!(json.contains("STUDY_"));

        let parsed: StudyId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
