use std::collections::{HashMap, HashSet};

use crate::error::{PipelineError, Result};
use crate::team_table::{TeamRow, TeamTable};

/// Full outer join of normalized category tables on team identity.
///
/// Columns appear in table order; teams appear in order of first sighting
/// across the tables. A team missing from a table gets nulls for that table's
/// columns. A team listed twice in one table, or a column name shared by two
/// tables, makes the join ambiguous and is rejected.
pub fn merge(tables: &[TeamTable]) -> Result<TeamTable> {
    let mut columns: Vec<String> = Vec::new();
    let mut seen_columns: HashSet<&str> = HashSet::new();
    for (pos, table) in tables.iter().enumerate() {
        if let Some(team) = table.duplicate_team() {
            return Err(PipelineError::merge_integrity(format!(
                "table {pos} lists {team} more than once"
            )));
        }
        for col in &table.columns {
            if !seen_columns.insert(col.as_str()) {
                return Err(PipelineError::merge_integrity(format!(
                    "column {col} appears in more than one table"
                )));
            }
            columns.push(col.clone());
        }
    }

    let mut order: Vec<String> = Vec::new();
    let mut slots: HashMap<String, Vec<Option<f64>>> = HashMap::new();
    let width = columns.len();
    let mut offset = 0usize;
    for table in tables {
        for row in &table.rows {
            let values = slots.entry(row.team.clone()).or_insert_with(|| {
                order.push(row.team.clone());
                vec![None; width]
            });
            for (i, v) in row.values.iter().enumerate().take(table.columns.len()) {
                values[offset + i] = *v;
            }
        }
        offset += table.columns.len();
    }

    let rows = order
        .into_iter()
        .map(|team| {
            let values = slots.remove(&team).unwrap_or_else(|| vec![None; width]);
            TeamRow { team, values }
        })
        .collect();

    let merged = TeamTable { columns, rows };
    log::debug!(
        "merged {} tables into {} teams x {} columns",
        tables.len(),
        merged.len(),
        merged.columns.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[(&str, &[f64])]) -> TeamTable {
        TeamTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|(team, vals)| TeamRow {
                    team: team.to_string(),
                    values: vals.iter().map(|v| Some(*v)).collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn outer_join_keeps_teams_missing_from_a_table() {
        let standard = table(&["Gls", "Ast"], &[("Arsenal", &[2.0, 1.0]), ("Chelsea", &[1.0, 0.5])]);
        let keepers = table(&["Saves"], &[("Chelsea", &[3.0]), ("Fulham", &[4.0])]);

        let merged = merge(&[standard, keepers]).expect("merge");
        assert_eq!(merged.columns, vec!["Gls", "Ast", "Saves"]);
        assert_eq!(merged.teams(), vec!["Arsenal", "Chelsea", "Fulham"]);
        assert_eq!(merged.value("Arsenal", "Saves"), None);
        assert_eq!(merged.value("Chelsea", "Saves"), Some(3.0));
        assert_eq!(merged.value("Fulham", "Gls"), None);
        assert_eq!(merged.value("Fulham", "Saves"), Some(4.0));
    }

    #[test]
    fn duplicate_team_in_a_table_is_rejected() {
        let standard = table(&["Gls"], &[("Arsenal", &[2.0]), ("Arsenal", &[1.0])]);
        assert!(matches!(
            merge(&[standard]),
            Err(PipelineError::MergeIntegrity(_))
        ));
    }

    #[test]
    fn shared_column_is_rejected() {
        let a = table(&["Int"], &[("Arsenal", &[2.0])]);
        let b = table(&["Int"], &[("Arsenal", &[1.0])]);
        assert!(matches!(merge(&[a, b]), Err(PipelineError::MergeIntegrity(_))));
    }
}
