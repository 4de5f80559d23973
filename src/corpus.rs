use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::matchup::{AWAY_TEAM_COLUMN, EXCLUDED_MATCHUP_COLUMNS, HOME_TEAM_COLUMN, prefixed_columns};
use crate::normalize::FULL_SEASON_GAMES;
use crate::outcome::Outcome;
use crate::pipeline::{GamesDivisor, build_team_table};
use crate::raw_table::{SeasonTables, StatCategory};
use crate::team_table::{SEASON_COLUMN, TeamTable, parse_cell};

pub const RESULT_COLUMN: &str = "FTR";
pub const HOME_GOALS_COLUMN: &str = "FTHG";
pub const AWAY_GOALS_COLUMN: &str = "FTAG";
pub const DATE_COLUMN: &str = "DateTime";

pub const TRAINING_SEASONS: [&str; 5] = [
    "2017-2018",
    "2018-2019",
    "2019-2020",
    "2020-2021",
    "2021-2022",
];

/// Explicit mapping from results-file team names to stats-page names.
/// Names without an entry are already canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamAliases {
    map: HashMap<String, String>,
}

impl TeamAliases {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            map: pairs
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
        }
    }

    pub fn premier_league_default() -> Self {
        Self::new(&[
            ("Cardiff", "Cardiff City"),
            ("Leeds", "Leeds United"),
            ("Leicester", "Leicester City"),
            ("Man City", "Manchester City"),
            ("Man United", "Manchester Utd"),
            ("Newcastle", "Newcastle Utd"),
            ("Norwich", "Norwich City"),
            ("Sheffield United", "Sheffield Utd"),
            ("Stoke", "Stoke City"),
            ("Swansea", "Swansea City"),
        ])
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        let trimmed = name.trim();
        self.map.get(trimmed).map(String::as_str).unwrap_or(trimmed)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// `2017-2018` → `2017-18`. Labels already in short form pass through.
pub fn short_season_label(season: &str) -> String {
    let trimmed = season.trim();
    match trimmed.split_once('-') {
        Some((start, end)) if end.len() == 4 && end.is_ascii() => format!("{start}-{}", &end[2..]),
        _ => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub season: String,
    pub date: Option<String>,
    pub home: String,
    pub away: String,
    pub home_goals: Option<i32>,
    pub away_goals: Option<i32>,
    pub result: Outcome,
}

/// Reads a results file with at least `Season, HomeTeam, AwayTeam, FTR`
/// columns. Non-UTF-8 bytes (older exports) are replaced, not rejected.
pub fn read_results_csv(path: &Path) -> Result<Vec<MatchResult>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.byte_headers()?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| String::from_utf8_lossy(h).trim() == name)
    };
    let require = |name: &str| {
        find(name).ok_or_else(|| {
            PipelineError::data_quality(format!("{} has no {name} column", path.display()))
        })
    };
    let season_idx = require(SEASON_COLUMN)?;
    let home_idx = require(HOME_TEAM_COLUMN)?;
    let away_idx = require(AWAY_TEAM_COLUMN)?;
    let ftr_idx = require(RESULT_COLUMN)?;
    let date_idx = find(DATE_COLUMN);
    let fthg_idx = find(HOME_GOALS_COLUMN);
    let ftag_idx = find(AWAY_GOALS_COLUMN);

    let mut out = Vec::new();
    for (line, record) in reader.byte_records().enumerate() {
        let record = record?;
        let field = |idx: usize| {
            record
                .get(idx)
                .map(|raw| String::from_utf8_lossy(raw).trim().to_string())
                .unwrap_or_default()
        };
        let goals = |idx: Option<usize>| idx.and_then(|i| field(i).parse::<i32>().ok());

        let code = field(ftr_idx);
        let result = Outcome::from_ftr(&code).ok_or_else(|| {
            PipelineError::data_quality(format!(
                "{} row {}: unknown result code {code:?}",
                path.display(),
                line + 2
            ))
        })?;
        out.push(MatchResult {
            season: short_season_label(&field(season_idx)),
            date: date_idx.map(&field).filter(|d| !d.is_empty()),
            home: field(home_idx),
            away: field(away_idx),
            home_goals: goals(fthg_idx),
            away_goals: goals(ftag_idx),
            result,
        });
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardColumns {
    #[default]
    Keep,
    Drop,
}

impl CardColumns {
    fn excluded(self) -> &'static [&'static str] {
        match self {
            CardColumns::Keep => &[],
            CardColumns::Drop => &EXCLUDED_MATCHUP_COLUMNS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusRow {
    pub season: String,
    pub home: String,
    pub away: String,
    pub label: Outcome,
    pub features: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledCorpus {
    /// Feature columns, home-prefixed then away-prefixed.
    pub columns: Vec<String>,
    pub rows: Vec<CorpusRow>,
}

impl LabeledCorpus {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn complete_rows(&self) -> impl Iterator<Item = &CorpusRow> {
        self.rows.iter().filter(|r| r.features.iter().all(Option::is_some))
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        let mut header = vec![
            SEASON_COLUMN.to_string(),
            HOME_TEAM_COLUMN.to_string(),
            AWAY_TEAM_COLUMN.to_string(),
            RESULT_COLUMN.to_string(),
        ];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;
        for row in &self.rows {
            let mut record = vec![
                row.season.clone(),
                row.home.clone(),
                row.away.clone(),
                row.label.class_index().to_string(),
            ];
            record.extend(
                row.features
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default()),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let fixed = [SEASON_COLUMN, HOME_TEAM_COLUMN, AWAY_TEAM_COLUMN, RESULT_COLUMN];
        for (idx, name) in fixed.iter().enumerate() {
            if headers.get(idx) != Some(*name) {
                return Err(PipelineError::data_quality(format!(
                    "{}: column {idx} should be {name}",
                    path.display()
                )));
            }
        }
        let columns: Vec<String> = headers.iter().skip(fixed.len()).map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let label = record
                .get(3)
                .and_then(|c| c.trim().parse::<usize>().ok())
                .and_then(Outcome::from_class_index)
                .ok_or_else(|| {
                    PipelineError::data_quality(format!("{}: bad label row", path.display()))
                })?;
            let features = record
                .iter()
                .skip(fixed.len())
                .map(|cell| {
                    parse_cell(cell).map_err(|_| {
                        PipelineError::data_quality(format!(
                            "{}: non-numeric feature {cell:?}",
                            path.display()
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push(CorpusRow {
                season: record.get(0).unwrap_or_default().to_string(),
                home: record.get(1).unwrap_or_default().to_string(),
                away: record.get(2).unwrap_or_default().to_string(),
                label,
                features,
            });
        }
        Ok(Self { columns, rows })
    }
}

pub fn build_season_team_stats(
    tables: &SeasonTables,
    categories: &[StatCategory],
) -> Result<TeamTable> {
    build_team_table(tables, GamesDivisor::Fixed(FULL_SEASON_GAMES), categories)
}

pub fn build_all_season_stats(
    seasons: &[SeasonTables],
    categories: &[StatCategory],
) -> Result<Vec<(String, TeamTable)>> {
    seasons
        .par_iter()
        .map(|tables| Ok((tables.season.clone(), build_season_team_stats(tables, categories)?)))
        .collect()
}

pub fn team_stats_path(dir: &Path, season: &str) -> PathBuf {
    dir.join(format!("{season}_teamstats.csv"))
}

pub fn write_season_stats(dir: &Path, season: &str, table: &TeamTable) -> Result<PathBuf> {
    let path = team_stats_path(dir, season);
    table.write_csv(&path, season)?;
    Ok(path)
}

pub fn read_season_stats(dir: &Path, season: &str) -> Result<TeamTable> {
    let (table, stored) = TeamTable::read_csv(&team_stats_path(dir, season))?;
    if !stored.is_empty() && stored != season {
        return Err(PipelineError::data_quality(format!(
            "{season}_teamstats.csv is labelled {stored}"
        )));
    }
    Ok(table)
}

/// Left-joins results onto home and away team rows by (season, team).
///
/// `seasons` holds per-season team tables under their long labels; results
/// from other seasons are ignored. Result team names go through `aliases`
/// first; a team still missing from its season's table gets null features.
pub fn build_corpus(
    seasons: &[(String, TeamTable)],
    results: &[MatchResult],
    aliases: &TeamAliases,
    cards: CardColumns,
) -> Result<LabeledCorpus> {
    let Some((_, first)) = seasons.first() else {
        return Err(PipelineError::data_quality("no seasons to build a corpus from"));
    };
    let base_columns = first.columns.clone();
    for (season, table) in seasons {
        if table.columns != base_columns {
            return Err(PipelineError::schema_mismatch(format!(
                "season {season} team stats have different columns"
            )));
        }
        if let Some(team) = table.duplicate_team() {
            return Err(PipelineError::merge_integrity(format!(
                "season {season} lists {team} more than once"
            )));
        }
    }

    let excluded = cards.excluded();
    let kept: Vec<usize> = base_columns
        .iter()
        .enumerate()
        .filter(|(_, c)| !excluded.contains(&c.as_str()))
        .map(|(idx, _)| idx)
        .collect();
    let columns = prefixed_columns(&base_columns, excluded);

    let mut by_label: HashMap<String, &TeamTable> = HashMap::with_capacity(seasons.len());
    for (season, table) in seasons {
        let label = short_season_label(season);
        if by_label.insert(label.clone(), table).is_some() {
            return Err(PipelineError::merge_integrity(format!(
                "season {label} has more than one team table"
            )));
        }
    }

    let mut unmatched: BTreeSet<(String, String)> = BTreeSet::new();
    let mut rows = Vec::new();
    for result in results {
        let Some(table) = by_label.get(&result.season) else {
            continue;
        };
        let home = aliases.canonical(&result.home);
        let away = aliases.canonical(&result.away);

        let mut side = |team: &str| -> Vec<Option<f64>> {
            match table.row(team) {
                Some(row) => kept
                    .iter()
                    .map(|i| row.values.get(*i).copied().flatten())
                    .collect(),
                None => {
                    unmatched.insert((result.season.clone(), team.to_string()));
                    vec![None; kept.len()]
                }
            }
        };
        let mut features = side(home);
        features.extend(side(away));

        rows.push(CorpusRow {
            season: result.season.clone(),
            home: home.to_string(),
            away: away.to_string(),
            label: result.result,
            features,
        });
    }

    for (season, team) in &unmatched {
        log::warn!("{season}: no team stats for {team}; its features are null");
    }
    log::info!(
        "corpus: {} labeled matches x {} features from {} seasons",
        rows.len(),
        columns.len(),
        seasons.len()
    );
    Ok(LabeledCorpus { columns, rows })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_labels_shorten() {
        assert_eq!(short_season_label("2017-2018"), "2017-18");
        assert_eq!(short_season_label("2021-22"), "2021-22");
    }

    #[test]
    fn aliases_map_only_listed_names() {
        let aliases = TeamAliases::premier_league_default();
        assert_eq!(aliases.canonical("Man United"), "Manchester Utd");
        assert_eq!(aliases.canonical(" Stoke "), "Stoke City");
        assert_eq!(aliases.canonical("Arsenal"), "Arsenal");
        assert_eq!(aliases.len(), 10);
    }
}
