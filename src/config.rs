use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::raw_table::{StatCategory, parse_category_list};
use crate::source::{FbrefSource, HtmlFileSource, SeasonSource};
use crate::synthetic::SyntheticSource;

pub const DEFAULT_SEASON: &str = "2022-2023";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSourceKind {
    Fbref,
    Html,
    Synthetic,
}

impl StatsSourceKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fbref" | "live" => Some(Self::Fbref),
            "html" | "file" | "files" => Some(Self::Html),
            "synthetic" | "fake" => Some(Self::Synthetic),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub season: String,
    pub model_path: PathBuf,
    pub stats_source: StatsSourceKind,
    pub stats_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub merge_categories: Vec<StatCategory>,
    pub history_export_path: PathBuf,
    pub synthetic_seed: u64,
    pub log_path: PathBuf,
}

/// `.env.local` wins over `.env`; real environment variables win over both.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let stats_source = match opt_env("STATS_SOURCE") {
            Some(raw) => StatsSourceKind::parse(&raw)
                .ok_or_else(|| anyhow!("STATS_SOURCE must be fbref, html or synthetic, got {raw:?}"))?,
            None => StatsSourceKind::Fbref,
        };
        let merge_categories = match opt_env("MERGE_CATEGORIES") {
            Some(raw) => parse_category_list(&raw)
                .ok_or_else(|| anyhow!("MERGE_CATEGORIES has an unknown category: {raw:?}"))?,
            None => StatCategory::MODEL_DEFAULT.to_vec(),
        };
        let fetch_timeout = Duration::from_secs(
            opt_env("FETCH_TIMEOUT_SECS")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(30)
                .clamp(1, 600),
        );

        Ok(Self {
            season: opt_env("SEASON").unwrap_or_else(|| DEFAULT_SEASON.to_string()),
            model_path: opt_env("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("models/model.json")),
            stats_source,
            stats_dir: opt_env("STATS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            fetch_timeout,
            merge_categories,
            history_export_path: opt_env("HISTORY_EXPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("prediction_history.xlsx")),
            synthetic_seed: opt_env("SYNTHETIC_SEED")
                .and_then(|val| val.parse::<u64>().ok())
                .unwrap_or(42),
            log_path: opt_env("LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("matchup_terminal.log")),
        })
    }

    pub fn season_source(&self) -> Box<dyn SeasonSource> {
        match self.stats_source {
            StatsSourceKind::Fbref => {
                Box::new(FbrefSource::new(self.fetch_timeout).with_cache_dir(self.stats_dir.clone()))
            }
            StatsSourceKind::Html => Box::new(HtmlFileSource::new(self.stats_dir.clone())),
            StatsSourceKind::Synthetic => Box::new(SyntheticSource::new(self.synthetic_seed)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StatsSourceKind;

    #[test]
    fn source_kind_accepts_aliases() {
        assert_eq!(StatsSourceKind::parse(" FBREF "), Some(StatsSourceKind::Fbref));
        assert_eq!(StatsSourceKind::parse("files"), Some(StatsSourceKind::Html));
        assert_eq!(StatsSourceKind::parse("fake"), Some(StatsSourceKind::Synthetic));
        assert_eq!(StatsSourceKind::parse("csv"), None);
    }
}
