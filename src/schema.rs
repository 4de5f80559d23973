use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{PipelineError, Result};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// Hex SHA-256 over the version and newline-joined column names.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        for col in &self.columns {
            hasher.update(col.as_bytes());
            hasher.update(b"\n");
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Fails unless `other` names exactly the same columns in the same order.
    pub fn ensure_matches(&self, other: &FeatureSchema) -> Result<()> {
        if self.version != other.version {
            return Err(PipelineError::schema_mismatch(format!(
                "schema version {} vs {}",
                self.version, other.version
            )));
        }
        if let Some(pos) = self
            .columns
            .iter()
            .zip(&other.columns)
            .position(|(a, b)| a != b)
        {
            return Err(PipelineError::schema_mismatch(format!(
                "column {pos} is {:?} but classifier expects {:?}",
                self.columns[pos], other.columns[pos]
            )));
        }
        if self.width() != other.width() {
            return Err(PipelineError::schema_mismatch(format!(
                "{} feature columns but classifier expects {}",
                self.width(),
                other.width()
            )));
        }
        Ok(())
    }

    /// Positions of this schema's columns inside `source`, by name.
    pub fn project_from(&self, source: &[String]) -> Result<Vec<usize>> {
        self.columns
            .iter()
            .map(|col| {
                source.iter().position(|s| s == col).ok_or_else(|| {
                    PipelineError::schema_mismatch(format!("source has no column {col}"))
                })
            })
            .collect()
    }
}
