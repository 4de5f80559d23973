use crate::error::PredictError;
use crate::outcome::{Outcome, Prob3};
use crate::service::{PredictionRecord, PredictionService};

pub const EMPTY_HISTORY_MESSAGE: &str = "No prediction history.";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionView {
    pub text: String,
    /// Home / draw / away slice sizes; `None` when the prediction failed.
    pub proportions: Option<Prob3>,
    pub outcome: Option<Outcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    pub home: String,
    pub away: String,
    pub outcome_label: &'static str,
    pub probabilities: Prob3,
}

impl From<&PredictionRecord> for HistoryRow {
    fn from(record: &PredictionRecord) -> Self {
        Self {
            home: record.home.clone(),
            away: record.away.clone(),
            outcome_label: record.outcome.label(),
            probabilities: record.probabilities,
        }
    }
}

impl HistoryRow {
    pub fn summary(&self) -> String {
        format!(
            "{} vs {}: {} (H {:.1}% / D {:.1}% / A {:.1}%)",
            self.home,
            self.away,
            self.outcome_label,
            self.probabilities.home * 100.0,
            self.probabilities.draw * 100.0,
            self.probabilities.away * 100.0
        )
    }
}

pub fn error_message(err: &PredictError) -> &'static str {
    match err {
        PredictError::InvalidMatchup(_) => "Pick two different teams.",
        PredictError::UnknownMatchup { .. } => "That matchup is not available this season.",
        PredictError::IncompleteFeatures { .. } => {
            "Not enough statistics for one of these teams to make a prediction."
        }
        PredictError::SchemaMismatch(_) => "The loaded model does not match this season's statistics.",
        PredictError::Classifier(_) => "The model could not produce a prediction.",
    }
}

pub fn on_predict(service: &PredictionService, home: &str, away: &str) -> PredictionView {
    match service.predict(home, away) {
        Ok(record) => PredictionView {
            text: format!(
                "Prediction: {} ({} vs {})",
                record.outcome.label(),
                record.home,
                record.away
            ),
            proportions: Some(record.probabilities),
            outcome: Some(record.outcome),
        },
        Err(err) => {
            log::warn!("prediction {home} vs {away} failed: {err}");
            PredictionView {
                text: error_message(&err).to_string(),
                proportions: None,
                outcome: None,
            }
        }
    }
}

/// History rows in prediction order.
pub fn on_show_history(service: &PredictionService) -> Vec<HistoryRow> {
    service.history().iter().map(HistoryRow::from).collect()
}
