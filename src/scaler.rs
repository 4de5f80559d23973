use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::matchup::{MatchupRow, MatchupTable};
use crate::schema::FeatureSchema;

/// Per-column mean and population variance, fitted once over a full table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    pub mean: Vec<f64>,
    pub variance: Vec<f64>,
    /// Divisor per column; 1.0 where the column has zero variance.
    pub scale: Vec<f64>,
    pub samples: usize,
}

impl ScalerState {
    /// Single batch pass over every row. Nulls are skipped when computing the
    /// moments and stay null when transformed.
    pub fn fit(rows: &[Vec<Option<f64>>], width: usize) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::data_quality(
                "cannot fit scaler over an empty matchup table",
            ));
        }

        let mut sum = vec![0.0_f64; width];
        let mut count = vec![0usize; width];
        for row in rows {
            if row.len() != width {
                return Err(PipelineError::data_quality(format!(
                    "row has {} features, expected {width}",
                    row.len()
                )));
            }
            for (j, v) in row.iter().enumerate() {
                if let Some(v) = v {
                    sum[j] += v;
                    count[j] += 1;
                }
            }
        }
        let mean: Vec<f64> = sum
            .iter()
            .zip(&count)
            .map(|(s, n)| if *n > 0 { s / *n as f64 } else { 0.0 })
            .collect();

        let mut sq = vec![0.0_f64; width];
        for row in rows {
            for (j, v) in row.iter().enumerate() {
                if let Some(v) = v {
                    sq[j] += (v - mean[j]).powi(2);
                }
            }
        }
        let variance: Vec<f64> = sq
            .iter()
            .zip(&count)
            .map(|(s, n)| if *n > 0 { s / *n as f64 } else { 0.0 })
            .collect();
        let scale = variance
            .iter()
            .map(|v| {
                let sd = v.sqrt();
                if sd > f64::EPSILON { sd } else { 1.0 }
            })
            .collect();

        Ok(Self {
            mean,
            variance,
            scale,
            samples: rows.len(),
        })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Callers pass rows of exactly `width()` values; extra values are
    /// dropped.
    pub fn transform(&self, features: &[Option<f64>]) -> Vec<Option<f64>> {
        features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(v, (mean, scale))| v.map(|x| (x - mean) / scale))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ScaledMatchupTable {
    schema: FeatureSchema,
    scaler: ScalerState,
    rows: Vec<MatchupRow>,
    index: HashMap<(String, String), usize>,
}

impl ScaledMatchupTable {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    pub fn rows(&self) -> &[MatchupRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn lookup(&self, home: &str, away: &str) -> Option<&MatchupRow> {
        self.index
            .get(&(home.to_string(), away.to_string()))
            .map(|idx| &self.rows[*idx])
    }

    pub fn teams(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in &self.rows {
            if !out.contains(&row.home) {
                out.push(row.home.clone());
            }
        }
        out
    }
}

pub fn fit(table: &MatchupTable) -> Result<ScalerState> {
    let features: Vec<Vec<Option<f64>>> = table.rows.iter().map(|r| r.features.clone()).collect();
    ScalerState::fit(&features, table.schema.width())
}

pub fn apply(state: &ScalerState, table: &MatchupTable) -> Result<ScaledMatchupTable> {
    if state.width() != table.schema.width() {
        return Err(PipelineError::schema_mismatch(format!(
            "scaler fitted on {} columns, table has {}",
            state.width(),
            table.schema.width()
        )));
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut index = HashMap::with_capacity(table.rows.len());
    for row in &table.rows {
        if row.features.len() != state.width() {
            return Err(PipelineError::schema_mismatch(format!(
                "matchup {} vs {} has {} features, scaler expects {}",
                row.home,
                row.away,
                row.features.len(),
                state.width()
            )));
        }
        let key = (row.home.clone(), row.away.clone());
        if index.insert(key, rows.len()).is_some() {
            return Err(PipelineError::merge_integrity(format!(
                "matchup {} vs {} appears more than once",
                row.home, row.away
            )));
        }
        rows.push(MatchupRow {
            home: row.home.clone(),
            away: row.away.clone(),
            features: state.transform(&row.features),
        });
    }

    Ok(ScaledMatchupTable {
        schema: table.schema.clone(),
        scaler: state.clone(),
        rows,
        index,
    })
}

pub fn fit_apply(table: &MatchupTable) -> Result<ScaledMatchupTable> {
    let state = fit(table)?;
    apply(&state, table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_column_scales_to_zero() {
        let rows = vec![vec![Some(2.0), Some(1.0)], vec![Some(2.0), Some(3.0)]];
        let state = ScalerState::fit(&rows, 2).expect("fit");
        assert_eq!(state.scale[0], 1.0);
        assert_eq!(state.transform(&rows[0]), vec![Some(0.0), Some(-1.0)]);
        assert_eq!(state.transform(&rows[1]), vec![Some(0.0), Some(1.0)]);
    }

    #[test]
    fn nulls_are_skipped_and_preserved() {
        let rows = vec![vec![Some(1.0)], vec![None], vec![Some(3.0)]];
        let state = ScalerState::fit(&rows, 1).expect("fit");
        assert_eq!(state.mean, vec![2.0]);
        assert_eq!(state.variance, vec![1.0]);
        assert_eq!(state.transform(&[None]), vec![None]);
    }

    #[test]
    fn empty_fit_is_rejected() {
        assert!(matches!(
            ScalerState::fit(&[], 3),
            Err(PipelineError::DataQuality(_))
        ));
    }

    #[test]
    fn apply_rejects_rows_wider_than_the_scaler() {
        let mut table = MatchupTable {
            schema: FeatureSchema::new(vec!["home_Gls".to_string(), "away_Gls".to_string()]),
            rows: vec![
                MatchupRow {
                    home: "Arsenal".to_string(),
                    away: "Chelsea".to_string(),
                    features: vec![Some(2.0), Some(1.0)],
                },
                MatchupRow {
                    home: "Chelsea".to_string(),
                    away: "Arsenal".to_string(),
                    features: vec![Some(1.0), Some(2.0)],
                },
            ],
        };
        let state = fit(&table).expect("fit");
        table.rows[0].features.push(Some(9.0));
        assert!(matches!(
            apply(&state, &table),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }
}
