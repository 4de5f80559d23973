use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, params};

use crate::corpus::{MatchResult, short_season_label};
use crate::error::{PipelineError, Result};
use crate::outcome::Outcome;

pub const DEFAULT_DB_FILE: &str = "results.sqlite";

#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub db_path: PathBuf,
    pub rows_read: usize,
    pub rows_upserted: usize,
    pub seasons: Vec<String>,
}

pub fn default_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DEFAULT_DB_FILE)
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS results (
            season TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            match_date TEXT NULL,
            home_goals INTEGER NULL,
            away_goals INTEGER NULL,
            ftr TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (season, home_team, away_team)
        );
        CREATE INDEX IF NOT EXISTS idx_results_season ON results(season);

        CREATE TABLE IF NOT EXISTS ingest_runs (
            run_id INTEGER PRIMARY KEY AUTOINCREMENT,
            started_at TEXT NOT NULL,
            source TEXT NOT NULL,
            rows_upserted INTEGER NOT NULL
        );
        "#,
    )?;
    Ok(())
}

fn ftr_code(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Home => "H",
        Outcome::Draw => "D",
        Outcome::Away => "A",
    }
}

/// Inserts or replaces results keyed by (season, home, away). Each league
/// season is a double round robin, so the key is unique per fixture.
pub fn upsert_results(conn: &mut Connection, source: &str, results: &[MatchResult]) -> Result<usize> {
    let now = Utc::now().to_rfc3339();
    let tx = conn.transaction()?;
    for r in results {
        tx.execute(
            r#"
            INSERT INTO results (
                season, home_team, away_team, match_date,
                home_goals, away_goals, ftr, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(season, home_team, away_team) DO UPDATE SET
                match_date = excluded.match_date,
                home_goals = excluded.home_goals,
                away_goals = excluded.away_goals,
                ftr = excluded.ftr,
                updated_at = excluded.updated_at
            "#,
            params![
                r.season,
                r.home,
                r.away,
                r.date,
                r.home_goals,
                r.away_goals,
                ftr_code(r.result),
                now,
            ],
        )?;
    }
    tx.execute(
        "INSERT INTO ingest_runs(started_at, source, rows_upserted) VALUES (?1, ?2, ?3)",
        params![now, source, results.len() as i64],
    )?;
    tx.commit()?;
    Ok(results.len())
}

/// Results for the given seasons (long or short labels), oldest first. An
/// empty `seasons` loads everything.
pub fn load_results(conn: &Connection, seasons: &[&str]) -> Result<Vec<MatchResult>> {
    let wanted: Vec<String> = seasons.iter().map(|s| short_season_label(s)).collect();
    let mut stmt = conn.prepare(
        r#"
        SELECT season, home_team, away_team, match_date, home_goals, away_goals, ftr
        FROM results
        ORDER BY season ASC, match_date ASC, home_team ASC, away_team ASC
        "#,
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<i32>>(4)?,
            row.get::<_, Option<i32>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (season, home, away, date, home_goals, away_goals, ftr) = row?;
        if !wanted.is_empty() && !wanted.contains(&season) {
            continue;
        }
        let result = Outcome::from_ftr(&ftr).ok_or_else(|| {
            PipelineError::data_quality(format!("stored result {home} vs {away} has code {ftr:?}"))
        })?;
        out.push(MatchResult {
            season,
            date,
            home,
            away,
            home_goals,
            away_goals,
            result,
        });
    }
    Ok(out)
}

pub fn ingest_results_csv(conn: &mut Connection, db_path: &Path, csv_path: &Path) -> Result<IngestSummary> {
    let results = crate::corpus::read_results_csv(csv_path)?;
    let rows_upserted = upsert_results(conn, &csv_path.display().to_string(), &results)?;
    let mut seasons: Vec<String> = results.iter().map(|r| r.season.clone()).collect();
    seasons.sort();
    seasons.dedup();
    log::info!(
        "ingested {rows_upserted} results from {} into {}",
        csv_path.display(),
        db_path.display()
    );
    Ok(IngestSummary {
        db_path: db_path.to_path_buf(),
        rows_read: results.len(),
        rows_upserted,
        seasons,
    })
}
