use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchup_terminal::config::{AppConfig, load_dotenv};
use matchup_terminal::corpus::{
    self, CardColumns, TRAINING_SEASONS, TeamAliases, build_all_season_stats, build_corpus,
};
use matchup_terminal::results_store;

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = AppConfig::from_env()?;
    let seasons: Vec<String> = parse_list_arg("--seasons")
        .unwrap_or_else(|| TRAINING_SEASONS.iter().map(|s| s.to_string()).collect());
    let out_path = parse_path_arg("--out").unwrap_or_else(|| config.stats_dir.join("fulldata.csv"));
    let cards = if has_flag("--drop-cards") {
        CardColumns::Drop
    } else {
        CardColumns::Keep
    };

    // One request at a time; normalization below runs in parallel.
    let source = config.season_source();
    let mut pages = Vec::with_capacity(seasons.len());
    for season in &seasons {
        let page = source
            .fetch_season(season)
            .with_context(|| format!("fetch season {season} from {}", source.describe()))?;
        pages.push(page);
    }
    let stats = build_all_season_stats(&pages, &config.merge_categories)?;

    // The corpus is built from the files as written.
    let mut persisted = Vec::with_capacity(stats.len());
    for (season, table) in &stats {
        let path = corpus::write_season_stats(&config.stats_dir, season, table)?;
        println!("Wrote {}", path.display());
        persisted.push((season.clone(), corpus::read_season_stats(&config.stats_dir, season)?));
    }

    let results = if let Some(csv_path) = parse_path_arg("--results") {
        corpus::read_results_csv(&csv_path)
            .with_context(|| format!("read results {}", csv_path.display()))?
    } else {
        let db_path = parse_path_arg("--db")
            .unwrap_or_else(|| results_store::default_db_path(&config.stats_dir));
        if !db_path.exists() {
            return Err(anyhow!(
                "no results: pass --results=<csv> or ingest into {} first",
                db_path.display()
            ));
        }
        let conn = results_store::open_db(&db_path)?;
        let wanted: Vec<&str> = seasons.iter().map(String::as_str).collect();
        results_store::load_results(&conn, &wanted)?
    };

    let corpus = build_corpus(
        &persisted,
        &results,
        &TeamAliases::premier_league_default(),
        cards,
    )?;
    corpus.write_csv(&out_path)?;

    println!("Corpus: {}", out_path.display());
    println!("Labeled matches: {}", corpus.len());
    println!("Complete rows: {}", corpus.complete_rows().count());
    println!("Feature columns: {}", corpus.columns.len());
    Ok(())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
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

fn parse_list_arg(name: &str) -> Option<Vec<String>> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut raw_value: Option<String> = None;
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}=")) {
            raw_value = Some(raw.trim().to_string());
            break;
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
        {
            raw_value = Some(next.trim().to_string());
            break;
        }
    }

    let out: Vec<String> = raw_value?
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if out.is_empty() { None } else { Some(out) }
}
