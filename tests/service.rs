use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

use matchup_terminal::PipelineError;
use matchup_terminal::PredictError;
use matchup_terminal::classifier::{Classifier, ModelArtifact, ModelParams};
use matchup_terminal::matchup::{MatchupRow, MatchupTable};
use matchup_terminal::outcome::{Outcome, PROB_SUM_TOLERANCE, Prob3};
use matchup_terminal::pipeline::{build_scaled_matchups, load_service};
use matchup_terminal::raw_table::StatCategory;
use matchup_terminal::scaler::{ScaledMatchupTable, fit_apply};
use matchup_terminal::schema::FeatureSchema;
use matchup_terminal::service::PredictionService;
use matchup_terminal::source::SeasonSource;
use matchup_terminal::synthetic::SyntheticSource;
use matchup_terminal::view::{self, EMPTY_HISTORY_MESSAGE};

/// Returns fixed probabilities and counts how often it was asked.
struct CountingClassifier {
    schema: FeatureSchema,
    probabilities: Prob3,
    calls: AtomicUsize,
}

impl CountingClassifier {
    fn new(schema: FeatureSchema, probabilities: Prob3) -> Self {
        Self {
            schema,
            probabilities,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classify(&self, _features: &[f64]) -> Result<Outcome, PredictError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probabilities.argmax())
    }

    fn class_probabilities(&self, _features: &[f64]) -> Result<Prob3, PredictError> {
        Ok(self.probabilities)
    }
}

/// Keeps every feature vector it is asked to classify.
struct RecordingClassifier {
    schema: FeatureSchema,
    seen: Mutex<Vec<Vec<f64>>>,
}

impl RecordingClassifier {
    fn seen(&self) -> Vec<Vec<f64>> {
        self.seen.lock().expect("lock").clone()
    }
}

impl Classifier for RecordingClassifier {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn classify(&self, features: &[f64]) -> Result<Outcome, PredictError> {
        self.seen.lock().expect("lock").push(features.to_vec());
        Ok(Outcome::Draw)
    }

    fn class_probabilities(&self, _features: &[f64]) -> Result<Prob3, PredictError> {
        Ok(Prob3::uniform())
    }
}

fn small_table() -> ScaledMatchupTable {
    let schema = FeatureSchema::new(vec![
        "home_Gls".to_string(),
        "home_Sh".to_string(),
        "away_Gls".to_string(),
        "away_Sh".to_string(),
    ]);
    let teams = [
        ("Arsenal", Some(2.1), Some(15.0)),
        ("Chelsea", Some(1.2), Some(11.0)),
        ("Fulham", Some(1.3), None),
    ];
    let mut rows = Vec::new();
    for (home, hg, hs) in teams {
        for (away, ag, ashots) in teams {
            if home != away {
                rows.push(MatchupRow {
                    home: home.to_string(),
                    away: away.to_string(),
                    features: vec![hg, hs, ag, ashots],
                });
            }
        }
    }
    fit_apply(&MatchupTable { schema, rows }).expect("scaled table")
}

fn counting_service(probabilities: Prob3) -> (PredictionService, Arc<CountingClassifier>) {
    let table = small_table();
    let classifier = Arc::new(CountingClassifier::new(table.schema().clone(), probabilities));
    let service = PredictionService::new(table, classifier.clone()).expect("service");
    (service, classifier)
}

#[test]
fn self_matchup_never_reaches_the_classifier() {
    let (service, classifier) = counting_service(Prob3::from_array([0.5, 0.3, 0.2]));
    assert!(matches!(
        service.predict("Arsenal", "Arsenal"),
        Err(PredictError::InvalidMatchup(_))
    ));
    assert_eq!(classifier.calls(), 0);
    assert_eq!(service.history_len(), 0);
}

#[test]
fn unknown_pair_is_reported() {
    let (service, classifier) = counting_service(Prob3::from_array([0.5, 0.3, 0.2]));
    let err = service.predict("Arsenal", "Wrexham").expect_err("unknown team");
    assert!(matches!(err, PredictError::UnknownMatchup { ref away, .. } if away == "Wrexham"));
    assert_eq!(classifier.calls(), 0);
}

#[test]
fn missing_features_are_named() {
    let (service, classifier) = counting_service(Prob3::from_array([0.5, 0.3, 0.2]));
    let err = service.predict("Fulham", "Chelsea").expect_err("Fulham has no shots");
    let PredictError::IncompleteFeatures { missing, .. } = &err else {
        panic!("expected incomplete features, got {err:?}");
    };
    assert_eq!(missing, &vec!["home_Sh".to_string()]);
    assert_eq!(classifier.calls(), 0);
    assert_eq!(service.history_len(), 0);
}

#[test]
fn successful_predictions_append_in_order() {
    let (service, classifier) = counting_service(Prob3::from_array([0.2, 0.3, 0.5]));
    let first = service.predict("Arsenal", "Chelsea").expect("prediction");
    assert_eq!(first.outcome, Outcome::Away);
    assert!((first.probabilities.sum() - 1.0).abs() <= PROB_SUM_TOLERANCE);

    let _ = service.predict("Arsenal", "Arsenal");
    service.predict("Chelsea", "Arsenal").expect("prediction");

    let history = service.history();
    assert_eq!(history.len(), 2);
    assert_eq!((history[0].home.as_str(), history[0].away.as_str()), ("Arsenal", "Chelsea"));
    assert_eq!((history[1].home.as_str(), history[1].away.as_str()), ("Chelsea", "Arsenal"));
    assert!(history[0].predicted_at <= history[1].predicted_at);
    assert_eq!(classifier.calls(), 2);
}

#[test]
fn swapped_pairs_send_mirrored_vectors_to_the_classifier() {
    let table = small_table();
    let classifier = Arc::new(RecordingClassifier {
        schema: table.schema().clone(),
        seen: Mutex::new(Vec::new()),
    });
    let service = PredictionService::new(table, classifier.clone()).expect("service");

    service.predict("Arsenal", "Chelsea").expect("prediction");
    service.predict("Chelsea", "Arsenal").expect("prediction");

    let seen = classifier.seen();
    assert_eq!(seen.len(), 2);
    assert_ne!(seen[0], seen[1]);
    let half = seen[0].len() / 2;
    let mirrored: Vec<f64> = seen[1][half..].iter().chain(&seen[1][..half]).copied().collect();
    // Home and away columns are scaled separately, so allow rounding.
    assert!(
        seen[0]
            .iter()
            .zip(&mirrored)
            .all(|(a, b)| (a - b).abs() < 1e-9),
        "{:?} vs {:?}",
        seen[0],
        seen[1]
    );
}

#[test]
fn unnormalized_probabilities_are_rejected_and_not_recorded() {
    let (service, _) = counting_service(Prob3 {
        home: 0.6,
        draw: 0.6,
        away: 0.6,
    });
    assert!(matches!(
        service.predict("Arsenal", "Chelsea"),
        Err(PredictError::Classifier(_))
    ));
    assert_eq!(service.history_len(), 0);
}

#[test]
fn service_refuses_a_classifier_with_other_columns() {
    let table = small_table();
    let mut columns = table.schema().columns.clone();
    columns.swap(0, 1);
    let classifier = Arc::new(CountingClassifier::new(
        FeatureSchema::new(columns),
        Prob3::uniform(),
    ));
    assert!(matches!(
        PredictionService::new(table, classifier),
        Err(PipelineError::SchemaMismatch(_))
    ));
}

#[test]
fn softmax_artifact_serves_a_synthetic_season() {
    let source = SyntheticSource::new(3).with_games(12);
    let tables = source.fetch_season("2022-2023").expect("season");
    let probe = build_scaled_matchups(&tables, &StatCategory::MODEL_DEFAULT).expect("scaled");
    let schema = probe.schema().clone();
    let width = schema.width();
    let half = width / 2;

    // Home goals push towards a home win, away goals towards an away win.
    let mut home_row = vec![0.0; width];
    home_row[0] = 0.8;
    let mut away_row = vec![0.0; width];
    away_row[half] = 0.8;
    let model = ModelArtifact::new(
        schema,
        ModelParams::Softmax {
            coefficients: [home_row, vec![0.0; width], away_row],
            intercepts: [0.2, 0.0, -0.1],
        },
    )
    .expect("artifact");

    let service = load_service(
        &source,
        "2022-2023",
        &StatCategory::MODEL_DEFAULT,
        Arc::new(model),
    )
    .expect("service");
    let teams = service.teams();
    assert_eq!(teams.len(), 20);

    let record = service.predict(&teams[0], &teams[1]).expect("prediction");
    assert!(record.probabilities.is_normalized());
    assert_eq!(record.outcome, record.probabilities.argmax());
}

#[test]
fn view_messages_are_distinct_per_failure() {
    let errors = [
        PredictError::InvalidMatchup("Arsenal".into()),
        PredictError::UnknownMatchup {
            home: "Arsenal".into(),
            away: "Wrexham".into(),
        },
        PredictError::IncompleteFeatures {
            home: "Fulham".into(),
            away: "Chelsea".into(),
            missing: vec!["home_Sh".into()],
        },
        PredictError::SchemaMismatch("width".into()),
        PredictError::Classifier("nan".into()),
    ];
    let messages: Vec<&str> = errors.iter().map(view::error_message).collect();
    for (i, a) in messages.iter().enumerate() {
        assert!(!a.is_empty());
        for b in &messages[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn view_reports_failures_without_proportions() {
    let (service, _) = counting_service(Prob3::from_array([0.5, 0.3, 0.2]));
    let failed = view::on_predict(&service, "Chelsea", "Chelsea");
    assert_eq!(failed.proportions, None);
    assert_eq!(
        failed.text,
        view::error_message(&PredictError::InvalidMatchup("Chelsea".into()))
    );

    let ok = view::on_predict(&service, "Arsenal", "Chelsea");
    assert_eq!(ok.outcome, Some(Outcome::Home));
    assert_eq!(ok.proportions, Some(Prob3::from_array([0.5, 0.3, 0.2])));
}

#[test]
fn empty_history_has_a_fixed_message_and_rows_follow_predictions() {
    let (service, _) = counting_service(Prob3::from_array([0.3, 0.4, 0.3]));
    assert!(view::on_show_history(&service).is_empty());
    assert!(!EMPTY_HISTORY_MESSAGE.is_empty());

    view::on_predict(&service, "Chelsea", "Arsenal");
    let rows = view::on_show_history(&service);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].home, "Chelsea");
    assert_eq!(rows[0].outcome_label, Outcome::Draw.label());
    assert!(rows[0].summary().contains("Chelsea vs Arsenal"));
}
