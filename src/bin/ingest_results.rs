use std::path::PathBuf;

use anyhow::{Context, Result};

use matchup_terminal::config::{AppConfig, load_dotenv};
use matchup_terminal::results_store;

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = AppConfig::from_env()?;
    let csv_path = parse_path_arg("--csv")
        .unwrap_or_else(|| config.stats_dir.join("results.csv"));
    let db_path =
        parse_path_arg("--db").unwrap_or_else(|| results_store::default_db_path(&config.stats_dir));

    let mut conn = results_store::open_db(&db_path)
        .with_context(|| format!("open sqlite db {}", db_path.display()))?;
    let summary = results_store::ingest_results_csv(&mut conn, &db_path, &csv_path)
        .with_context(|| format!("ingest {}", csv_path.display()))?;

    println!("Results ingest complete");
    println!("DB: {}", summary.db_path.display());
    println!("Rows read: {}", summary.rows_read);
    println!("Rows upserted: {}", summary.rows_upserted);
    println!("Seasons: {}", summary.seasons.join(", "));
    Ok(())
}

fn parse_path_arg(name: &str) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(path) = arg.strip_prefix(&format!("{name}=")) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Some(PathBuf::from(trimmed));
            }
        }
        if arg == name {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(PathBuf::from(next));
            }
        }
    }
    None
}
