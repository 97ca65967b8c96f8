//! Synthetic row generation.
//!
//! Every row of a batch carries the same JSON document; only the key differs.
//! The document is serialized once and shared by reference across the batch.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, BenchResult};

/// Bytes of filler per requested kilobyte.
pub const BYTES_PER_KB: usize = 1024;

const FILLER: char = 'x';

/// Synthetic JSON document of shape `{"data": "xxx..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    pub data: String,
}

impl Payload {
    /// Serializes the payload to its JSON text form.
    pub fn to_json(&self) -> BenchResult<String> {
        serde_json::to_string(self)
            .map_err(|err| BenchError::write(format!("failed to serialize payload: {err}")))
    }
}

/// Builds a payload whose filler is exactly `size_kb * 1024` bytes.
pub fn generate(size_kb: u32) -> Payload {
    let len = size_kb as usize * BYTES_PER_KB;
    Payload {
        data: std::iter::repeat(FILLER).take(len).collect(),
    }
}

/// One row destined for the benchmark table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticRow {
    /// `fake_id_<i>`, unique only within its batch.
    pub key: String,
    /// Serialized payload, shared by every row of the batch.
    pub payload: Arc<str>,
}

/// Builds `row_count` rows sharing one serialized payload.
pub fn build_rows(row_count: u64, payload: &Payload) -> BenchResult<Vec<SyntheticRow>> {
    let json: Arc<str> = Arc::from(payload.to_json()?);
    Ok((0..row_count)
        .map(|i| SyntheticRow {
            key: format!("fake_id_{i}"),
            payload: Arc::clone(&json),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filler_length_matches_requested_kilobytes() {
        assert_eq!(generate(10).data.len(), 10_240);
        assert_eq!(generate(1).data.len(), 1024);
        assert!(generate(0).data.is_empty());
        assert!(generate(3).data.chars().all(|c| c == 'x'));
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(generate(4), generate(4));
    }

    #[test]
    fn serialized_payload_has_data_field() {
        let json = generate(1).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["data"].as_str().unwrap().len(), 1024);
        // `{"data":"` + filler + `"}`
        assert_eq!(json.len(), 1024 + 11);
    }

    #[test]
    fn rows_share_payload_and_number_keys_from_zero() {
        let rows = build_rows(3, &generate(1)).unwrap();
        let keys: Vec<&str> = rows.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, ["fake_id_0", "fake_id_1", "fake_id_2"]);
        assert!(Arc::ptr_eq(&rows[0].payload, &rows[2].payload));
    }

    #[test]
    fn zero_rows_is_empty() {
        assert!(build_rows(0, &generate(1)).unwrap().is_empty());
    }
}
