use std::path::PathBuf;

use anyhow::{Context, Result};

use matchup_terminal::classifier::ModelArtifact;
use matchup_terminal::config::{AppConfig, load_dotenv};
use matchup_terminal::corpus::LabeledCorpus;
use matchup_terminal::evaluation::{self, CalibrationBin, Metrics};

const DEFAULT_BINS: usize = 10;

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let config = AppConfig::from_env()?;
    let corpus_path =
        parse_path_arg("--corpus").unwrap_or_else(|| config.stats_dir.join("fulldata.csv"));
    let model_path = parse_path_arg("--model").unwrap_or_else(|| config.model_path.clone());
    let bins = parse_usize_arg("--bins").unwrap_or(DEFAULT_BINS).clamp(2, 50);

    let corpus = LabeledCorpus::read_csv(&corpus_path)
        .with_context(|| format!("read corpus {}", corpus_path.display()))?;
    let model = ModelArtifact::load(&model_path)
        .with_context(|| format!("load model {}", model_path.display()))?;
    let eval = evaluation::evaluate_classifier(&corpus, &model, bins)?;

    println!("Corpus: {} ({} rows)", corpus_path.display(), corpus.len());
    println!("Model: {} ({})", model_path.display(), model.kind());
    println!("Skipped (incomplete features): {}", eval.skipped_incomplete);
    print_metrics("model", &eval.model);
    print_metrics("baseline", &eval.baseline);
    println!(
        "Brier gain vs baseline: {:+.4}",
        eval.baseline.brier - eval.model.brier
    );

    if has_flag("--calibration") {
        print_bins("home", &eval.home_bins);
        print_bins("draw", &eval.draw_bins);
        print_bins("away", &eval.away_bins);
    }
    Ok(())
}

fn print_metrics(label: &str, m: &Metrics) {
    println!(
        "{label:<9} n={} brier={:.4} logloss={:.4} acc={:.3}",
        m.samples, m.brier, m.log_loss, m.accuracy
    );
}

fn print_bins(label: &str, bins: &[CalibrationBin]) {
    println!();
    println!("Calibration ({label}):");
    for bin in bins.iter().filter(|b| b.count > 0) {
        println!(
            "  [{:.2}, {:.2}) n={:<5} pred={:.3} actual={:.3}",
            bin.bucket_start, bin.bucket_end, bin.count, bin.avg_pred, bin.actual_rate
        );
    }
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

fn parse_usize_arg(name: &str) -> Option<usize> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<usize>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<usize>()
        {
            return Some(v);
        }
    }
    None
}
