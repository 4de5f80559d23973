use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

pub const SQUAD_COLUMN: &str = "Squad";
pub const MATCHES_PLAYED_COLUMN: &str = "MP";
pub const SUMMARY_TABLE_POSITION: usize = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedColumn {
    /// Over-header group, `None` where the source leaves it blank.
    pub group: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderLayout {
    Flat(Vec<String>),
    Grouped(Vec<GroupedColumn>),
}

impl HeaderLayout {
    pub fn width(&self) -> usize {
        match self {
            HeaderLayout::Flat(cols) => cols.len(),
            HeaderLayout::Grouped(cols) => cols.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawStatTable {
    pub name: String,
    pub header: HeaderLayout,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl FlatTable {
    /// Index of `name`, failing if it is absent or appears more than once.
    pub fn unique_index(&self, name: &str, table: &str) -> Result<usize> {
        let mut hits = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() == name)
            .map(|(idx, _)| idx);
        let Some(first) = hits.next() else {
            return Err(PipelineError::data_quality(format!(
                "{table} table has no column {name}"
            )));
        };
        if hits.next().is_some() {
            return Err(PipelineError::data_quality(format!(
                "{table} table has column {name} more than once after flattening"
            )));
        }
        Ok(first)
    }
}

impl RawStatTable {
    pub fn flat(name: &str, columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            header: HeaderLayout::Flat(columns.iter().map(|c| c.to_string()).collect()),
            rows,
        }
    }

    pub fn grouped(name: &str, columns: &[(Option<&str>, &str)], rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.to_string(),
            header: HeaderLayout::Grouped(
                columns
                    .iter()
                    .map(|(group, col)| GroupedColumn {
                        group: group.map(|g| g.to_string()),
                        name: col.to_string(),
                    })
                    .collect(),
            ),
            rows,
        }
    }

    /// Drops every column whose group is in `excluded_groups` and keeps leaf
    /// names. Rows shorter than the header are padded with empty cells.
    pub fn flatten(&self, excluded_groups: &[&str]) -> FlatTable {
        let keep: Vec<(usize, String)> = match &self.header {
            HeaderLayout::Flat(cols) => cols.iter().cloned().enumerate().collect(),
            HeaderLayout::Grouped(cols) => cols
                .iter()
                .enumerate()
                .filter(|(_, c)| {
                    c.group
                        .as_deref()
                        .is_none_or(|g| !excluded_groups.iter().any(|ex| ex.eq_ignore_ascii_case(g)))
                })
                .map(|(idx, c)| (idx, c.name.clone()))
                .collect(),
        };

        let rows = self
            .rows
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|(idx, _)| row.get(*idx).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        FlatTable {
            columns: keep.into_iter().map(|(_, name)| name).collect(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatCategory {
    Standard,
    Goalkeeping,
    Shooting,
    PassTypes,
    Creativity,
    Defensive,
    Possession,
    Misc,
}

/// Where a category lives on the season page and which columns survive.
#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub position: usize,
    pub excluded_groups: &'static [&'static str],
    pub columns: &'static [&'static str],
    /// Whether columns are cumulative counts to divide by games played.
    pub per_match: bool,
}

impl StatCategory {
    pub const ALL: [StatCategory; 8] = [
        StatCategory::Standard,
        StatCategory::Goalkeeping,
        StatCategory::Shooting,
        StatCategory::PassTypes,
        StatCategory::Creativity,
        StatCategory::Defensive,
        StatCategory::Possession,
        StatCategory::Misc,
    ];

    /// Categories merged into the team table the shipped models were trained
    /// on. Creativity is normalized but not part of that schema.
    pub const MODEL_DEFAULT: [StatCategory; 7] = [
        StatCategory::Standard,
        StatCategory::Goalkeeping,
        StatCategory::Shooting,
        StatCategory::PassTypes,
        StatCategory::Defensive,
        StatCategory::Possession,
        StatCategory::Misc,
    ];

    pub fn spec(self) -> CategorySpec {
        match self {
            StatCategory::Standard => CategorySpec {
                position: 2,
                excluded_groups: &["Playing Time", "Expected", "Per 90 Minutes"],
                columns: &["Gls", "Ast", "CrdY", "CrdR", "PrgC", "PrgP"],
                per_match: true,
            },
            StatCategory::Goalkeeping => CategorySpec {
                position: 4,
                excluded_groups: &[],
                columns: &["Saves"],
                per_match: true,
            },
            StatCategory::Shooting => CategorySpec {
                position: 8,
                excluded_groups: &["Expected"],
                columns: &["Sh", "SoT"],
                per_match: true,
            },
            StatCategory::PassTypes => CategorySpec {
                position: 12,
                excluded_groups: &["Corner Kicks", "Outcomes"],
                columns: &["FK", "TB", "Sw", "Crs", "CK"],
                per_match: true,
            },
            StatCategory::Creativity => CategorySpec {
                position: 14,
                excluded_groups: &["SCA Types", "GCA Types"],
                columns: &["SCA", "GCA"],
                per_match: true,
            },
            StatCategory::Defensive => CategorySpec {
                position: 16,
                excluded_groups: &["Challenges"],
                columns: &["TklW", "Blocks", "Int", "Clr", "Err"],
                per_match: true,
            },
            // Possession share is already a rate.
            StatCategory::Possession => CategorySpec {
                position: 18,
                excluded_groups: &["Touches", "Take-Ons", "Carries", "Receiving"],
                columns: &["Poss"],
                per_match: false,
            },
            StatCategory::Misc => CategorySpec {
                position: 22,
                excluded_groups: &["Aerial Duels"],
                columns: &["Fls", "Fld", "Off", "PKwon", "PKcon", "Recov"],
                per_match: true,
            },
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            StatCategory::Standard => "standard",
            StatCategory::Goalkeeping => "goalkeeping",
            StatCategory::Shooting => "shooting",
            StatCategory::PassTypes => "passtypes",
            StatCategory::Creativity => "creativity",
            StatCategory::Defensive => "defensive",
            StatCategory::Possession => "possession",
            StatCategory::Misc => "misc",
        }
    }

    pub fn from_key(raw: &str) -> Option<Self> {
        let key = raw.trim().to_ascii_lowercase();
        StatCategory::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl fmt::Display for StatCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

pub fn parse_category_list(raw: &str) -> Option<Vec<StatCategory>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let category = StatCategory::from_key(part)?;
        if !out.contains(&category) {
            out.push(category);
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[derive(Debug, Clone)]
pub struct SeasonTables {
    pub season: String,
    pub summary: RawStatTable,
    pub categories: BTreeMap<StatCategory, RawStatTable>,
}

impl SeasonTables {
    /// Picks the summary and category tables out of a page's tables by their
    /// fixed positions. Requires the whole page; a truncated one is rejected.
    pub fn from_page_tables(season: &str, tables: Vec<RawStatTable>) -> Result<Self> {
        let needed = StatCategory::ALL
            .iter()
            .map(|c| c.spec().position)
            .max()
            .unwrap_or(SUMMARY_TABLE_POSITION)
            + 1;
        if tables.len() < needed {
            return Err(PipelineError::data_quality(format!(
                "season {season} page has {} tables, expected at least {needed}",
                tables.len()
            )));
        }

        let summary = tables[SUMMARY_TABLE_POSITION].clone();
        let categories = StatCategory::ALL
            .iter()
            .map(|c| (*c, tables[c.spec().position].clone()))
            .collect();

        Ok(Self {
            season: season.to_string(),
            summary,
            categories,
        })
    }

    pub fn category(&self, category: StatCategory) -> Result<&RawStatTable> {
        self.categories.get(&category).ok_or_else(|| {
            PipelineError::data_quality(format!(
                "season {} is missing the {category} table",
                self.season
            ))
        })
    }
}
