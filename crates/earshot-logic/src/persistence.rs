//! Save/Load of tracker state.
//!
//! Only the belief vector and the learned behavior weights are persisted.
//! Every other table is rebuilt from the room/door topology on load, so a
//! snapshot stays small and never goes stale with respect to derived data.
//! The binary format uses bincode; weights can also travel as JSON for the
//! game's settings store.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::behavior::BehaviorWeights;
use crate::error::PersistError;

/// Version number for the snapshot format (increment when format changes)
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable tracker state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerSnapshot {
    /// Snapshot format version
    pub version: u32,
    /// Probability per room, indexed by room id
    pub belief: Vec<f64>,
    /// Learned behavior weights
    pub weights: BehaviorWeights,
}

impl TrackerSnapshot {
    pub fn new(belief: Vec<f64>, weights: BehaviorWeights) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            belief,
            weights,
        }
    }
}

/// Save a snapshot to a writer
pub fn save_snapshot<W: Write>(writer: W, snapshot: &TrackerSnapshot) -> Result<(), PersistError> {
    bincode::serialize_into(writer, snapshot)?;
    Ok(())
}

/// Load a snapshot from a reader
pub fn load_snapshot<R: Read>(reader: R) -> Result<TrackerSnapshot, PersistError> {
    let snapshot: TrackerSnapshot = bincode::deserialize_from(reader)?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: snapshot.version,
        });
    }

    Ok(snapshot)
}

/// Encode behavior weights for an external settings store.
pub fn weights_to_json(weights: &BehaviorWeights) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(weights)?)
}

/// Decode behavior weights; out-of-range values are sanitized.
pub fn weights_from_json(json: &str) -> Result<BehaviorWeights, PersistError> {
    let weights: BehaviorWeights = serde_json::from_str(json)?;
    Ok(weights.sanitized())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_roundtrip() {
        let snapshot = TrackerSnapshot::new(vec![0.1, 0.2, 0.7], BehaviorWeights::default());

        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, &snapshot).expect("Save failed");
        let loaded = load_snapshot(&buffer[..]).expect("Load failed");

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_version_mismatch() {
        let mut snapshot = TrackerSnapshot::new(vec![1.0], BehaviorWeights::default());
        snapshot.version = SNAPSHOT_VERSION + 1;

        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, &snapshot).unwrap();
        let err = load_snapshot(&buffer[..]).unwrap_err();
        assert!(matches!(
            err,
            PersistError::VersionMismatch { expected: 1, found: 2 }
        ));
    }

    #[test]
    fn test_truncated_input() {
        let snapshot = TrackerSnapshot::new(vec![0.5, 0.5], BehaviorWeights::default());
        let mut buffer = Vec::new();
        save_snapshot(&mut buffer, &snapshot).unwrap();
        buffer.truncate(buffer.len() / 2);
        assert!(matches!(
            load_snapshot(&buffer[..]),
            Err(PersistError::Bincode(_))
        ));
    }

    #[test]
    fn test_weights_json() {
        let weights = BehaviorWeights {
            run_propensity: 0.35,
            ..BehaviorWeights::default()
        };
        let json = weights_to_json(&weights).unwrap();
        assert!(json.contains("run_propensity"));
        assert_eq!(weights_from_json(&json).unwrap(), weights);
    }

    #[test]
    fn test_weights_json_is_sanitized() {
        let json = r#"{"exploration":-2.0,"item_fetch":0.5,"door_to_door":0.5,"run_propensity":1.5}"#;
        let weights = weights_from_json(json).unwrap();
        assert_eq!(weights.exploration, 0.0);
        assert_eq!(weights.run_propensity, 1.0);
        assert!(matches!(
            weights_from_json("not json"),
            Err(PersistError::Json(_))
        ));
    }
}
