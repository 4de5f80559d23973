use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{PipelineError, Result};
use crate::html_table::parse_tables;
use crate::http_client::fetch_text;
use crate::raw_table::SeasonTables;

pub const FBREF_COMPETITION: u32 = 9;
pub const FBREF_COMPETITION_SLUG: &str = "Premier-League";

/// Returns the complete, ordered table set for one season, or an error. A
/// source never hands back a partial page.
pub trait SeasonSource {
    fn fetch_season(&self, season: &str) -> Result<SeasonTables>;

    fn describe(&self) -> String;
}

pub fn season_url(season: &str) -> String {
    format!(
        "https://fbref.com/en/comps/{FBREF_COMPETITION}/{season}/{season}-{FBREF_COMPETITION_SLUG}-Stats"
    )
}

/// Live season pages. Fetched pages are optionally written to `cache_dir`
/// as `<season>.html`, which [`HtmlFileSource`] reads back.
pub struct FbrefSource {
    pub timeout: Duration,
    pub cache_dir: Option<PathBuf>,
}

impl FbrefSource {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            cache_dir: None,
        }
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }
}

impl SeasonSource for FbrefSource {
    fn fetch_season(&self, season: &str) -> Result<SeasonTables> {
        let url = season_url(season);
        log::info!("fetching {url} (timeout {:?})", self.timeout);
        let html = fetch_text(&url, self.timeout)?;
        let tables = parse_tables(&html);
        let parsed = SeasonTables::from_page_tables(season, tables)?;
        if let Some(dir) = &self.cache_dir
            && let Err(err) = write_page(dir, season, &html)
        {
            log::warn!("could not cache {season} page in {}: {err}", dir.display());
        }
        Ok(parsed)
    }

    fn describe(&self) -> String {
        "fbref".to_string()
    }
}

fn write_page(dir: &Path, season: &str, html: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    let path = page_path(dir, season);
    let tmp = path.with_extension("html.tmp");
    fs::write(&tmp, html)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}

pub fn page_path(dir: &Path, season: &str) -> PathBuf {
    dir.join(format!("{season}.html"))
}

/// Saved season pages on disk.
pub struct HtmlFileSource {
    pub dir: PathBuf,
}

impl HtmlFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl SeasonSource for HtmlFileSource {
    fn fetch_season(&self, season: &str) -> Result<SeasonTables> {
        let path = page_path(&self.dir, season);
        let html = fs::read_to_string(&path).map_err(|err| {
            PipelineError::Source(format!("cannot read {}: {err}", path.display()))
        })?;
        SeasonTables::from_page_tables(season, parse_tables(&html))
    }

    fn describe(&self) -> String {
        format!("html files in {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_url_follows_competition_layout() {
        assert_eq!(
            season_url("2022-2023"),
            "https://fbref.com/en/comps/9/2022-2023/2022-2023-Premier-League-Stats"
        );
    }

    #[test]
    fn missing_page_file_is_a_source_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = HtmlFileSource::new(dir.path());
        assert!(matches!(
            source.fetch_season("2022-2023"),
            Err(PipelineError::Source(_))
        ));
    }
}
