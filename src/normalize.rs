use crate::error::{PipelineError, Result};
use crate::raw_table::{MATCHES_PLAYED_COLUMN, RawStatTable, SQUAD_COLUMN, StatCategory};
use crate::team_table::{TeamRow, TeamTable, parse_cell};

pub const FULL_SEASON_GAMES: f64 = 38.0;

/// Mean matches played across teams in the league summary table.
///
/// Every team row must carry a numeric `MP`, and the mean must be a positive
/// finite number, otherwise rate normalization would divide by zero.
pub fn average_games_played(summary: &RawStatTable) -> Result<f64> {
    let flat = summary.flatten(&[]);
    let mp_idx = flat.unique_index(MATCHES_PLAYED_COLUMN, &summary.name)?;
    let squad_idx = flat.unique_index(SQUAD_COLUMN, &summary.name).ok();

    if flat.rows.is_empty() {
        return Err(PipelineError::data_quality(format!(
            "{} table has no team rows",
            summary.name
        )));
    }

    let mut total = 0.0;
    for row in &flat.rows {
        let raw = row.get(mp_idx).map(String::as_str).unwrap_or_default();
        let team = squad_idx
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("?");
        let played = parse_cell(raw)
            .ok()
            .flatten()
            .ok_or_else(|| {
                PipelineError::data_quality(format!(
                    "{team} has missing or malformed games played ({raw:?})"
                ))
            })?;
        total += played;
    }

    let avg = total / flat.rows.len() as f64;
    validate_games(avg)?;
    Ok(avg)
}

fn validate_games(games: f64) -> Result<()> {
    if !games.is_finite() || games <= 0.0 {
        return Err(PipelineError::data_quality(format!(
            "games-played divisor must be positive, got {games}"
        )));
    }
    Ok(())
}

/// Cleans one raw category table into per-team rows.
///
/// Output has one row per source row and exactly the category's allow-listed
/// columns in catalog order. Counting columns are divided by `games`.
pub fn normalize(raw: &RawStatTable, category: StatCategory, games: f64) -> Result<TeamTable> {
    let spec = category.spec();
    if spec.per_match {
        validate_games(games)?;
    }

    let flat = raw.flatten(spec.excluded_groups);
    let squad_idx = flat.unique_index(SQUAD_COLUMN, category.key())?;
    let col_idx = spec
        .columns
        .iter()
        .map(|col| flat.unique_index(col, category.key()))
        .collect::<Result<Vec<_>>>()?;

    let mut out = TeamTable::new(spec.columns.iter().map(|c| c.to_string()).collect());
    for row in &flat.rows {
        let team = row.get(squad_idx).map(|s| s.trim()).unwrap_or_default();
        if team.is_empty() {
            return Err(PipelineError::data_quality(format!(
                "{category} table has a row without a team"
            )));
        }

        let mut values = Vec::with_capacity(col_idx.len());
        for (idx, name) in col_idx.iter().zip(spec.columns) {
            let raw_cell = row.get(*idx).map(String::as_str).unwrap_or_default();
            let value = parse_cell(raw_cell).map_err(|_| {
                PipelineError::data_quality(format!(
                    "{category} table: {team} has non-numeric {name} ({raw_cell:?})"
                ))
            })?;
            values.push(if spec.per_match {
                value.map(|v| v / games)
            } else {
                value
            });
        }
        out.rows.push(TeamRow {
            team: team.to_string(),
            values,
        });
    }

    log::debug!(
        "normalized {category} table: {} teams, {} columns",
        out.len(),
        out.columns.len()
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|c| c.to_string()).collect()
    }

    fn summary(mp: &[&str]) -> RawStatTable {
        RawStatTable::flat(
            "league",
            &["Rk", "Squad", "MP", "W"],
            mp.iter()
                .enumerate()
                .map(|(i, m)| cells(&[&(i + 1).to_string(), &format!("Team {i}"), m, "1"]))
                .collect(),
        )
    }

    fn shooting(rows: &[(&str, &str, &str)]) -> RawStatTable {
        RawStatTable::grouped(
            "shooting",
            &[
                (None, "Squad"),
                (None, "# Pl"),
                (Some("Standard"), "Gls"),
                (Some("Standard"), "Sh"),
                (Some("Standard"), "SoT"),
                (Some("Expected"), "xG"),
                (Some("Expected"), "Sh"),
            ],
            rows.iter()
                .map(|(team, sh, sot)| cells(&[team, "20", "30", sh, sot, "28.1", "9"]))
                .collect(),
        )
    }

    #[test]
    fn average_games_is_mean_of_mp() {
        let avg = average_games_played(&summary(&["10", "12"])).expect("valid summary");
        assert!((avg - 11.0).abs() < 1e-12);
    }

    #[test]
    fn zero_or_missing_games_is_a_data_quality_error() {
        assert!(matches!(
            average_games_played(&summary(&["0", "0"])),
            Err(PipelineError::DataQuality(_))
        ));
        assert!(matches!(
            average_games_played(&summary(&["10", ""])),
            Err(PipelineError::DataQuality(_))
        ));
        assert!(matches!(
            normalize(&shooting(&[("Arsenal", "10", "5")]), StatCategory::Shooting, 0.0),
            Err(PipelineError::DataQuality(_))
        ));
    }

    #[test]
    fn shooting_is_divided_by_games_and_expected_group_dropped() {
        let raw = shooting(&[("Arsenal", "200", "80"), ("Chelsea", "1,000", "")]);
        let table = normalize(&raw, StatCategory::Shooting, 20.0).expect("normalize");
        assert_eq!(table.columns, vec!["Sh", "SoT"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.value("Arsenal", "Sh"), Some(10.0));
        assert_eq!(table.value("Arsenal", "SoT"), Some(4.0));
        assert_eq!(table.value("Chelsea", "Sh"), Some(50.0));
        assert_eq!(table.value("Chelsea", "SoT"), None);
    }

    #[test]
    fn possession_is_left_unscaled() {
        let raw = RawStatTable::grouped(
            "possession",
            &[
                (None, "Squad"),
                (None, "# Pl"),
                (None, "Poss"),
                (Some("Touches"), "Touches"),
            ],
            vec![cells(&["Arsenal", "25", "58.4", "20000"])],
        );
        let table = normalize(&raw, StatCategory::Possession, 0.0).expect("normalize");
        assert_eq!(table.columns, vec!["Poss"]);
        assert_eq!(table.value("Arsenal", "Poss"), Some(58.4));
    }

    #[test]
    fn missing_allow_listed_column_is_rejected() {
        let raw = RawStatTable::grouped(
            "goalkeeping",
            &[(None, "Squad"), (Some("Performance"), "GA")],
            vec![cells(&["Arsenal", "30"])],
        );
        assert!(matches!(
            normalize(&raw, StatCategory::Goalkeeping, 10.0),
            Err(PipelineError::DataQuality(_))
        ));
    }

    #[test]
    fn non_numeric_cell_is_rejected() {
        let raw = shooting(&[("Arsenal", "lots", "5")]);
        assert!(matches!(
            normalize(&raw, StatCategory::Shooting, 10.0),
            Err(PipelineError::DataQuality(_))
        ));
    }
}
