use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::raw_table::SQUAD_COLUMN;

/// Column holding the season label in persisted team-stat files.
pub const SEASON_COLUMN: &str = "Season";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRow {
    pub team: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamTable {
    pub columns: Vec<String>,
    pub rows: Vec<TeamRow>,
}

impl TeamTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn teams(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.team.as_str()).collect()
    }

    pub fn row(&self, team: &str) -> Option<&TeamRow> {
        self.rows.iter().find(|r| r.team == team)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn value(&self, team: &str, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.row(team)?.values.get(idx).copied().flatten()
    }

    /// First team name that appears more than once, if any.
    pub fn duplicate_team(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .find(|r| !seen.insert(r.team.as_str()))
            .map(|r| r.team.as_str())
    }

    /// Writes `Squad, <columns...>, Season`; nulls are empty cells.
    pub fn write_csv(&self, path: &Path, season: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push(SQUAD_COLUMN.to_string());
        header.extend(self.columns.iter().cloned());
        header.push(SEASON_COLUMN.to_string());
        writer.write_record(&header)?;

        for row in &self.rows {
            let mut record = Vec::with_capacity(header.len());
            record.push(row.team.clone());
            record.extend(row.values.iter().map(|v| format_cell(*v)));
            record.push(season.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a file written by [`TeamTable::write_csv`], returning the table
    /// and its season label.
    pub fn read_csv(path: &Path) -> Result<(Self, String)> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let squad_idx = headers
            .iter()
            .position(|h| h == SQUAD_COLUMN)
            .ok_or_else(|| {
                PipelineError::data_quality(format!("{} has no Squad column", path.display()))
            })?;
        let season_idx = headers.iter().position(|h| h == SEASON_COLUMN);
        let value_cols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, h)| *idx != squad_idx && Some(*idx) != season_idx && !h.is_empty())
            .map(|(idx, h)| (idx, h.to_string()))
            .collect();

        let mut table = TeamTable::new(value_cols.iter().map(|(_, h)| h.clone()).collect());
        let mut season = String::new();
        for record in reader.records() {
            let record = record?;
            if let Some(idx) = season_idx
                && season.is_empty()
            {
                season = record.get(idx).unwrap_or_default().to_string();
            }
            let mut values = Vec::with_capacity(value_cols.len());
            for (idx, name) in &value_cols {
                let raw = record.get(*idx).unwrap_or_default();
                values.push(parse_cell(raw).map_err(|_| {
                    PipelineError::data_quality(format!(
                        "{}: column {name} has non-numeric value {raw:?}",
                        path.display()
                    ))
                })?);
            }
            table.rows.push(TeamRow {
                team: record.get(squad_idx).unwrap_or_default().trim().to_string(),
                values,
            });
        }
        Ok((table, season))
    }
}

fn format_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Parses a numeric stat cell. Empty cells are nulls; thousands separators
/// are accepted.
pub(crate) fn parse_cell(raw: &str) -> std::result::Result<Option<f64>, ()> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Ok(None);
    }
    let value = cleaned.parse::<f64>().map_err(|_| ())?;
    if value.is_finite() { Ok(Some(value)) } else { Err(()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_cell_handles_separators_and_blanks() {
        assert_eq!(parse_cell("1,234"), Ok(Some(1234.0)));
        assert_eq!(parse_cell("  "), Ok(None));
        assert_eq!(parse_cell("52.3"), Ok(Some(52.3)));
        assert!(parse_cell("n/a").is_err());
        assert!(parse_cell("inf").is_err());
    }

    #[test]
    fn csv_keeps_nulls_and_season() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("2021-2022_teamstats.csv");
        let table = TeamTable {
            columns: vec!["Gls".to_string(), "Saves".to_string()],
            rows: vec![
                TeamRow {
                    team: "Arsenal".to_string(),
                    values: vec![Some(2.0), None],
                },
                TeamRow {
                    team: "Chelsea".to_string(),
                    values: vec![Some(1.5), Some(3.25)],
                },
            ],
        };
        table.write_csv(&path, "2021-22").expect("write");
        let (back, season) = TeamTable::read_csv(&path).expect("read");
        assert_eq!(season, "2021-22");
        assert_eq!(back, table);
    }

    #[test]
    fn duplicate_team_is_reported() {
        let mut table = TeamTable::new(vec!["Gls".to_string()]);
        for team in ["Arsenal", "Chelsea", "Arsenal"] {
            table.rows.push(TeamRow {
                team: team.to_string(),
                values: vec![Some(1.0)],
            });
        }
        assert_eq!(table.duplicate_team(), Some("Arsenal"));
    }
}
