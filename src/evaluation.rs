use crate::classifier::Classifier;
use crate::corpus::LabeledCorpus;
use crate::error::{PipelineError, PredictError, Result};
use crate::outcome::{Outcome, Prob3};
use crate::scaler::ScalerState;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

impl Metrics {
    fn empty() -> Self {
        Self {
            samples: 0,
            brier: 0.0,
            log_loss: 0.0,
            accuracy: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_pred: f64,
    pub actual_rate: f64,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model: Metrics,
    /// Constant prediction at the corpus' own outcome frequencies.
    pub baseline: Metrics,
    pub skipped_incomplete: usize,
    pub home_bins: Vec<CalibrationBin>,
    pub draw_bins: Vec<CalibrationBin>,
    pub away_bins: Vec<CalibrationBin>,
}

pub fn empirical_outcome_probs(outcomes: &[Outcome]) -> Prob3 {
    if outcomes.is_empty() {
        return Prob3::uniform();
    }

    let mut counts = [0usize; 3];
    for outcome in outcomes {
        counts[outcome.class_index()] += 1;
    }
    let n = outcomes.len() as f64;
    Prob3::from_array(counts.map(|c| c as f64 / n))
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[Outcome]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::empty();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let y = Prob3::one_hot(*outcome);
        brier_sum +=
            (p.home - y.home).powi(2) + (p.draw - y.draw).powi(2) + (p.away - y.away).powi(2);
        log_loss_sum += -p.get(*outcome).clamp(1e-12, 1.0).ln();
        if p.argmax() == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

pub fn calibration_bins(
    predictions: &[Prob3],
    outcomes: &[Outcome],
    class: Outcome,
    bins: usize,
) -> Vec<CalibrationBin> {
    let bins = bins.max(2);
    let mut counts = vec![0usize; bins];
    let mut pred_sum = vec![0.0_f64; bins];
    let mut actual_sum = vec![0.0_f64; bins];

    for (p, outcome) in predictions.iter().zip(outcomes) {
        let class_prob = p.get(class).clamp(0.0, 1.0);
        let idx = ((class_prob * bins as f64).floor() as usize).min(bins - 1);
        counts[idx] += 1;
        pred_sum[idx] += class_prob;
        if *outcome == class {
            actual_sum[idx] += 1.0;
        }
    }

    (0..bins)
        .map(|i| {
            let count = counts[i];
            let (avg_pred, actual_rate) = if count > 0 {
                (pred_sum[i] / count as f64, actual_sum[i] / count as f64)
            } else {
                (0.0, 0.0)
            };
            CalibrationBin {
                bucket_start: i as f64 / bins as f64,
                bucket_end: (i + 1) as f64 / bins as f64,
                count,
                avg_pred,
                actual_rate,
            }
        })
        .collect()
}

fn predict_error(err: PredictError) -> PipelineError {
    match err {
        PredictError::SchemaMismatch(msg) => PipelineError::SchemaMismatch(msg),
        other => PipelineError::DataQuality(other.to_string()),
    }
}

/// Scores `classifier` against a labeled corpus.
///
/// The classifier's columns are picked out of the corpus by name, standardized
/// with a scaler fitted over the complete rows (as at training time), then
/// classified. Rows with any missing feature are skipped and counted.
pub fn evaluate_classifier(
    corpus: &LabeledCorpus,
    classifier: &dyn Classifier,
    bins: usize,
) -> Result<Evaluation> {
    let projection = classifier.schema().project_from(&corpus.columns)?;

    let mut features: Vec<Vec<Option<f64>>> = Vec::new();
    let mut outcomes: Vec<Outcome> = Vec::new();
    let mut skipped_incomplete = 0usize;
    for row in &corpus.rows {
        let picked: Vec<Option<f64>> = projection
            .iter()
            .map(|idx| row.features.get(*idx).copied().flatten())
            .collect();
        if picked.iter().any(Option::is_none) {
            skipped_incomplete += 1;
            continue;
        }
        features.push(picked);
        outcomes.push(row.label);
    }
    if features.is_empty() {
        return Err(PipelineError::data_quality(
            "corpus has no rows with every model feature present",
        ));
    }

    let scaler = ScalerState::fit(&features, projection.len())?;
    let mut predictions = Vec::with_capacity(features.len());
    for row in &features {
        let scaled: Vec<f64> = scaler.transform(row).into_iter().flatten().collect();
        predictions.push(classifier.class_probabilities(&scaled).map_err(predict_error)?);
    }

    let baseline_p = empirical_outcome_probs(&outcomes);
    let evaluation = Evaluation {
        model: evaluate_probs(&predictions, &outcomes),
        baseline: evaluate_probs(&vec![baseline_p; outcomes.len()], &outcomes),
        skipped_incomplete,
        home_bins: calibration_bins(&predictions, &outcomes, Outcome::Home, bins),
        draw_bins: calibration_bins(&predictions, &outcomes, Outcome::Draw, bins),
        away_bins: calibration_bins(&predictions, &outcomes, Outcome::Away, bins),
    };
    log::info!(
        "evaluated {} matches ({} skipped): brier {:.4} vs baseline {:.4}",
        evaluation.model.samples,
        skipped_incomplete,
        evaluation.model.brier,
        evaluation.baseline.brier
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_predictions_have_zero_brier() {
        let outcomes = vec![Outcome::Home, Outcome::Draw, Outcome::Away];
        let preds: Vec<Prob3> = outcomes.iter().map(|o| Prob3::one_hot(*o)).collect();
        let m = evaluate_probs(&preds, &outcomes);
        assert_eq!(m.samples, 3);
        assert!(m.brier < 1e-12);
        assert_eq!(m.accuracy, 1.0);
    }

    #[test]
    fn bins_cover_the_unit_interval() {
        let preds = vec![
            Prob3 {
                home: 0.05,
                draw: 0.5,
                away: 0.45,
            },
            Prob3 {
                home: 1.0,
                draw: 0.0,
                away: 0.0,
            },
        ];
        let outcomes = vec![Outcome::Draw, Outcome::Home];
        let bins = calibration_bins(&preds, &outcomes, Outcome::Home, 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins[0].count, 1);
        assert_eq!(bins[9].count, 1);
        assert_eq!(bins[9].actual_rate, 1.0);
    }

    #[test]
    fn empirical_frequencies_sum_to_one() {
        let p = empirical_outcome_probs(&[Outcome::Home, Outcome::Home, Outcome::Away, Outcome::Draw]);
        assert_eq!(p.home, 0.5);
        assert!(p.is_normalized());
    }

    #[test]
    fn classifier_is_scored_on_projected_complete_rows() {
        use crate::classifier::{ModelArtifact, ModelParams};
        use crate::corpus::CorpusRow;
        use crate::schema::FeatureSchema;

        let row = |label, features: Vec<Option<f64>>| CorpusRow {
            season: "2017-18".to_string(),
            home: "A".to_string(),
            away: "B".to_string(),
            label,
            features,
        };
        // Corpus carries an extra card column the model does not use.
        let corpus = LabeledCorpus {
            columns: vec![
                "home_Gls".to_string(),
                "home_CrdY".to_string(),
                "away_Gls".to_string(),
            ],
            rows: vec![
                row(Outcome::Home, vec![Some(3.0), Some(1.0), Some(1.0)]),
                row(Outcome::Away, vec![Some(1.0), Some(2.0), Some(3.0)]),
                row(Outcome::Draw, vec![Some(2.0), None, Some(2.0)]),
                row(Outcome::Home, vec![None, Some(1.0), Some(2.0)]),
            ],
        };
        let model = ModelArtifact::new(
            FeatureSchema::new(vec!["home_Gls".to_string(), "away_Gls".to_string()]),
            ModelParams::Softmax {
                coefficients: [vec![2.0, -2.0], vec![0.0, 0.0], vec![-2.0, 2.0]],
                intercepts: [0.0, 0.0, 0.0],
            },
        )
        .expect("model");

        let eval = evaluate_classifier(&corpus, &model, 5).expect("evaluation");
        assert_eq!(eval.skipped_incomplete, 1);
        assert_eq!(eval.model.samples, 3);
        assert_eq!(eval.home_bins.len(), 5);
        assert!(eval.model.brier < eval.baseline.brier);
    }
}
