use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::FeatureSchema;
use crate::team_table::TeamTable;

pub const HOME_TEAM_COLUMN: &str = "HomeTeam";
pub const AWAY_TEAM_COLUMN: &str = "AwayTeam";
pub const HOME_PREFIX: &str = "home_";
pub const AWAY_PREFIX: &str = "away_";

/// Disciplinary columns kept per team but left out of matchup features.
pub const EXCLUDED_MATCHUP_COLUMNS: [&str; 2] = ["CrdY", "CrdR"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupRow {
    pub home: String,
    pub away: String,
    pub features: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct MatchupTable {
    pub schema: FeatureSchema,
    pub rows: Vec<MatchupRow>,
}

impl MatchupTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, home: &str, away: &str) -> Option<&MatchupRow> {
        self.rows.iter().find(|r| r.home == home && r.away == away)
    }
}

/// Home- then away-prefixed copies of `columns`, skipping `excluded`.
pub fn prefixed_columns(columns: &[String], excluded: &[&str]) -> Vec<String> {
    let kept: Vec<&String> = columns
        .iter()
        .filter(|c| !excluded.contains(&c.as_str()))
        .collect();
    kept.iter()
        .map(|c| format!("{HOME_PREFIX}{c}"))
        .chain(kept.iter().map(|c| format!("{AWAY_PREFIX}{c}")))
        .collect()
}

/// Expands `n` teams into the `n * (n - 1)` ordered pairs, home-major in team
/// order. Row `(A, B)` holds A's features then B's; `(B, A)` holds them
/// swapped.
pub fn expand(merged: &TeamTable) -> MatchupTable {
    let kept_idx: Vec<usize> = merged
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !EXCLUDED_MATCHUP_COLUMNS.contains(&c.as_str()))
        .map(|(idx, _)| idx)
        .collect();
    let schema = FeatureSchema::new(prefixed_columns(
        &merged.columns,
        &EXCLUDED_MATCHUP_COLUMNS,
    ));

    let kept_idx = &kept_idx;
    let teams = &merged.rows;
    let rows: Vec<MatchupRow> = teams
        .par_iter()
        .enumerate()
        .flat_map_iter(move |(h, home)| {
            teams
                .iter()
                .enumerate()
                .filter(move |(a, _)| *a != h)
                .map(move |(_, away)| {
                    let mut features = Vec::with_capacity(kept_idx.len() * 2);
                    features.extend(kept_idx.iter().map(|i| home.values.get(*i).copied().flatten()));
                    features.extend(kept_idx.iter().map(|i| away.values.get(*i).copied().flatten()));
                    MatchupRow {
                        home: home.team.clone(),
                        away: away.team.clone(),
                        features,
                    }
                })
        })
        .collect();

    log::debug!(
        "expanded {} teams into {} matchups x {} features",
        merged.len(),
        rows.len(),
        schema.width()
    );
    MatchupTable { schema, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team_table::TeamRow;

    fn merged(teams: &[(&str, f64)]) -> TeamTable {
        TeamTable {
            columns: vec!["Gls".to_string(), "CrdY".to_string(), "Saves".to_string()],
            rows: teams
                .iter()
                .map(|(team, g)| TeamRow {
                    team: team.to_string(),
                    values: vec![Some(*g), Some(0.1), Some(g * 2.0)],
                })
                .collect(),
        }
    }

    #[test]
    fn cards_are_dropped_and_columns_prefixed_in_order() {
        let table = expand(&merged(&[("A", 1.0), ("B", 2.0)]));
        assert_eq!(
            table.schema.columns,
            vec!["home_Gls", "home_Saves", "away_Gls", "away_Saves"]
        );
    }

    #[test]
    fn rows_are_home_major_without_self_pairs() {
        let table = expand(&merged(&[("A", 1.0), ("B", 2.0), ("C", 3.0)]));
        let pairs: Vec<(&str, &str)> = table
            .rows
            .iter()
            .map(|r| (r.home.as_str(), r.away.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A", "B"),
                ("A", "C"),
                ("B", "A"),
                ("B", "C"),
                ("C", "A"),
                ("C", "B")
            ]
        );
    }

    #[test]
    fn single_team_yields_no_rows() {
        assert!(expand(&merged(&[("A", 1.0)])).is_empty());
    }
}
