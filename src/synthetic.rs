use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::raw_table::{
    MATCHES_PLAYED_COLUMN, RawStatTable, SQUAD_COLUMN, SUMMARY_TABLE_POSITION, SeasonTables,
    StatCategory,
};
use crate::source::SeasonSource;

pub const PREMIER_LEAGUE_2022_23: [&str; 20] = [
    "Arsenal",
    "Aston Villa",
    "Bournemouth",
    "Brentford",
    "Brighton",
    "Chelsea",
    "Crystal Palace",
    "Everton",
    "Fulham",
    "Leeds United",
    "Leicester City",
    "Liverpool",
    "Manchester City",
    "Manchester Utd",
    "Newcastle Utd",
    "Nott'ham Forest",
    "Southampton",
    "Tottenham",
    "West Ham",
    "Wolves",
];

pub struct SyntheticSource {
    pub seed: u64,
    pub teams: Vec<String>,
    /// Matches played per team; `None` draws a mid-season count per team.
    pub games: Option<u32>,
}

impl SyntheticSource {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            teams: PREMIER_LEAGUE_2022_23.iter().map(|t| t.to_string()).collect(),
            games: None,
        }
    }

    pub fn with_teams(mut self, teams: Vec<String>) -> Self {
        self.teams = teams;
        self
    }

    pub fn with_games(mut self, games: u32) -> Self {
        self.games = Some(games);
        self
    }
}

impl SeasonSource for SyntheticSource {
    fn fetch_season(&self, season: &str) -> Result<SeasonTables> {
        let season_salt = season.bytes().fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
        let mut rng = StdRng::seed_from_u64(self.seed ^ season_salt);
        SeasonTables::from_page_tables(season, page_tables(&mut rng, &self.teams, self.games))
    }

    fn describe(&self) -> String {
        format!("synthetic (seed {}, {} teams)", self.seed, self.teams.len())
    }
}

/// Typical per-match rate for each stat, used to draw season totals.
fn per_match_rate(column: &str) -> f64 {
    match column {
        "Gls" => 1.4,
        "Ast" => 1.0,
        "CrdY" => 1.8,
        "CrdR" => 0.05,
        "PrgC" => 17.0,
        "PrgP" => 40.0,
        "Saves" => 2.8,
        "Sh" => 12.5,
        "SoT" => 4.2,
        "FK" => 12.0,
        "TB" => 1.5,
        "Sw" => 3.0,
        "Crs" => 16.0,
        "CK" => 5.0,
        "SCA" => 21.0,
        "GCA" => 2.4,
        "TklW" => 9.5,
        "Blocks" => 11.0,
        "Int" => 8.5,
        "Clr" => 17.0,
        "Err" => 0.3,
        "Fls" => 10.5,
        "Fld" => 10.0,
        "Off" => 1.8,
        "PKwon" => 0.12,
        "PKcon" => 0.12,
        "Recov" => 50.0,
        _ => 1.0,
    }
}

fn page_tables(rng: &mut StdRng, teams: &[String], games: Option<u32>) -> Vec<RawStatTable> {
    let played: Vec<u32> = teams
        .iter()
        .map(|_| games.unwrap_or_else(|| rng.gen_range(10..=14)))
        .collect();
    let strength: Vec<f64> = teams.iter().map(|_| rng.gen_range(0.7..1.3)).collect();

    let last = StatCategory::ALL
        .iter()
        .map(|c| c.spec().position)
        .max()
        .unwrap_or(SUMMARY_TABLE_POSITION);
    let mut tables: Vec<RawStatTable> = (0..=last)
        .map(|pos| RawStatTable::flat(&format!("filler_{pos}"), &[SQUAD_COLUMN], Vec::new()))
        .collect();

    tables[SUMMARY_TABLE_POSITION] = RawStatTable::flat(
        "league_table",
        &["Rk", SQUAD_COLUMN, MATCHES_PLAYED_COLUMN, "Pts"],
        teams
            .iter()
            .enumerate()
            .map(|(idx, team)| {
                vec![
                    (idx + 1).to_string(),
                    team.clone(),
                    played[idx].to_string(),
                    ((played[idx] as f64) * 1.4 * strength[idx]).round().to_string(),
                ]
            })
            .collect(),
    );

    for category in StatCategory::ALL {
        let spec = category.spec();
        let mut header: Vec<(Option<&str>, &str)> = vec![(None, SQUAD_COLUMN), (None, "# Pl")];
        // Leaf names repeated under dropped groups, as real pages do.
        for group in spec.excluded_groups {
            header.push((Some(*group), spec.columns[0]));
        }
        for col in spec.columns {
            let group = if spec.per_match { Some("Performance") } else { None };
            header.push((group, *col));
        }

        let rows = teams
            .iter()
            .enumerate()
            .map(|(idx, team)| {
                let mut row = vec![team.clone(), rng.gen_range(18..30).to_string()];
                for _ in spec.excluded_groups {
                    row.push(format!("{:.2}", rng.gen_range(0.0..5.0)));
                }
                for col in spec.columns {
                    let cell = if spec.per_match {
                        let rate = per_match_rate(col) * strength[idx] * rng.gen_range(0.8..1.2);
                        format!("{:.0}", rate * played[idx] as f64)
                    } else {
                        format!("{:.1}", (50.0 * strength[idx]).clamp(30.0, 70.0))
                    };
                    row.push(cell);
                }
                row
            })
            .collect();

        tables[spec.position] = RawStatTable::grouped(category.key(), &header, rows);
    }

    tables
}
