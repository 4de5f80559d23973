use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classifier::Classifier;
use crate::error::{PredictError, Result};
use crate::outcome::{Outcome, Prob3};
use crate::scaler::ScaledMatchupTable;
use crate::schema::FeatureSchema;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub home: String,
    pub away: String,
    pub outcome: Outcome,
    pub probabilities: Prob3,
    pub predicted_at: DateTime<Utc>,
}

/// Records in call order. Entries are only ever appended.
#[derive(Debug, Default)]
pub struct HistoryLog {
    records: Mutex<Vec<PredictionRecord>>,
}

impl HistoryLog {
    fn lock(&self) -> MutexGuard<'_, Vec<PredictionRecord>> {
        // A poisoned lock still holds a consistent Vec: appends are the only
        // mutation.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn append(&self, record: PredictionRecord) {
        self.lock().push(record);
    }

    pub fn snapshot(&self) -> Vec<PredictionRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

pub struct PredictionService {
    table: ScaledMatchupTable,
    classifier: Arc<dyn Classifier>,
    history: HistoryLog,
}

impl PredictionService {
    /// Refuses to start when the table's columns differ from the
    /// classifier's input schema.
    pub fn new(table: ScaledMatchupTable, classifier: Arc<dyn Classifier>) -> Result<Self> {
        table.schema().ensure_matches(classifier.schema())?;
        log::info!(
            "prediction service ready: {} matchups, schema {}",
            table.len(),
            &table.schema().fingerprint()[..12]
        );
        Ok(Self {
            table,
            classifier,
            history: HistoryLog::default(),
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.table.schema()
    }

    pub fn table(&self) -> &ScaledMatchupTable {
        &self.table
    }

    pub fn teams(&self) -> Vec<String> {
        self.table.teams()
    }

    pub fn predict(&self, home: &str, away: &str) -> std::result::Result<PredictionRecord, PredictError> {
        if home == away {
            return Err(PredictError::InvalidMatchup(home.to_string()));
        }

        let row = self
            .table
            .lookup(home, away)
            .ok_or_else(|| PredictError::UnknownMatchup {
                home: home.to_string(),
                away: away.to_string(),
            })?;

        let columns = &self.table.schema().columns;
        let missing: Vec<String> = row
            .features
            .iter()
            .zip(columns)
            .filter(|(v, _)| v.is_none())
            .map(|(_, c)| c.clone())
            .collect();
        if !missing.is_empty() {
            return Err(PredictError::IncompleteFeatures {
                home: home.to_string(),
                away: away.to_string(),
                missing,
            });
        }
        let features: Vec<f64> = row.features.iter().flatten().copied().collect();

        let expected = self.classifier.schema().width();
        if features.len() != expected {
            return Err(PredictError::SchemaMismatch(format!(
                "row has {} features, classifier expects {expected}",
                features.len()
            )));
        }

        let outcome = self.classifier.classify(&features)?;
        let probabilities = self.classifier.class_probabilities(&features)?;
        if !probabilities.is_normalized() {
            return Err(PredictError::Classifier(format!(
                "probabilities {:?} sum to {}",
                probabilities.as_array(),
                probabilities.sum()
            )));
        }

        let record = PredictionRecord {
            home: home.to_string(),
            away: away.to_string(),
            outcome,
            probabilities,
            predicted_at: Utc::now(),
        };
        log::debug!(
            "{home} vs {away}: {} {:?}",
            outcome.label(),
            probabilities.as_array()
        );
        self.history.append(record.clone());
        Ok(record)
    }

    pub fn history(&self) -> Vec<PredictionRecord> {
        self.history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
