use std::sync::Arc;

use crate::classifier::Classifier;
use crate::error::Result;
use crate::matchup::{MatchupTable, expand};
use crate::merge::merge;
use crate::normalize::{average_games_played, normalize};
use crate::raw_table::{SeasonTables, StatCategory};
use crate::scaler::{ScaledMatchupTable, fit_apply};
use crate::service::PredictionService;
use crate::source::SeasonSource;
use crate::team_table::TeamTable;

/// How many games to divide counting stats by.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GamesDivisor {
    /// Mean `MP` of the season's summary table (in-progress seasons).
    SummaryAverage,
    Fixed(f64),
}

/// Normalizes `categories` and outer-joins them in the given order.
pub fn build_team_table(
    tables: &SeasonTables,
    divisor: GamesDivisor,
    categories: &[StatCategory],
) -> Result<TeamTable> {
    let games = match divisor {
        GamesDivisor::SummaryAverage => average_games_played(&tables.summary)?,
        GamesDivisor::Fixed(games) => games,
    };
    log::debug!("season {}: dividing counts by {games:.2} games", tables.season);

    let normalized = categories
        .iter()
        .map(|c| normalize(tables.category(*c)?, *c, games))
        .collect::<Result<Vec<_>>>()?;
    merge(&normalized)
}

pub fn build_matchups(
    tables: &SeasonTables,
    categories: &[StatCategory],
) -> Result<MatchupTable> {
    let merged = build_team_table(tables, GamesDivisor::SummaryAverage, categories)?;
    Ok(expand(&merged))
}

pub fn build_scaled_matchups(
    tables: &SeasonTables,
    categories: &[StatCategory],
) -> Result<ScaledMatchupTable> {
    fit_apply(&build_matchups(tables, categories)?)
}

/// Fetches `season`, builds its scaled matchup table and wraps it in a
/// service backed by `classifier`.
pub fn load_service(
    source: &dyn SeasonSource,
    season: &str,
    categories: &[StatCategory],
    classifier: Arc<dyn Classifier>,
) -> Result<PredictionService> {
    let tables = source.fetch_season(season)?;
    let scaled = build_scaled_matchups(&tables, categories)?;
    log::info!(
        "season {season} from {}: {} matchups x {} features",
        source.describe(),
        scaled.len(),
        scaled.schema().width()
    );
    PredictionService::new(scaled, classifier)
}
