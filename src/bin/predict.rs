use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};

use matchup_terminal::classifier::{Classifier, ModelArtifact};
use matchup_terminal::config::{AppConfig, load_dotenv};
use matchup_terminal::pipeline::load_service;
use matchup_terminal::view::{on_predict, on_show_history};

fn main() -> Result<()> {
    load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let mut config = AppConfig::from_env()?;
    if let Some(season) = parse_string_arg("--season") {
        config.season = season;
    }
    if let Some(model) = parse_string_arg("--model") {
        config.model_path = PathBuf::from(model);
    }

    let model = ModelArtifact::load(&config.model_path)
        .with_context(|| format!("load model {}", config.model_path.display()))?;
    let classifier: Arc<dyn Classifier> = Arc::new(model);
    let source = config.season_source();
    let service = load_service(
        source.as_ref(),
        &config.season,
        &config.merge_categories,
        classifier,
    )
    .with_context(|| format!("load season {}", config.season))?;

    if has_flag("--teams") {
        for team in service.teams() {
            println!("{team}");
        }
        return Ok(());
    }

    let pairs: Vec<(String, String)> = if has_flag("--all") {
        let teams = service.teams();
        teams
            .iter()
            .flat_map(|h| {
                teams
                    .iter()
                    .filter(move |a| *a != h)
                    .map(move |a| (h.clone(), a.clone()))
            })
            .collect()
    } else {
        let positional = positional_args();
        let [home, away] = positional.as_slice() else {
            return Err(anyhow!(
                "usage: predict [--season=S] [--model=PATH] <HOME> <AWAY> | --all | --teams"
            ));
        };
        vec![(home.clone(), away.clone())]
    };

    for (home, away) in &pairs {
        let view = on_predict(&service, home, away);
        match view.proportions {
            Some(p) => println!(
                "{home} vs {away}: {} | H {:.1}% D {:.1}% A {:.1}%",
                view.text,
                p.home * 100.0,
                p.draw * 100.0,
                p.away * 100.0
            ),
            None => println!("{home} vs {away}: {}", view.text),
        }
    }

    if has_flag("--history") {
        println!();
        for (idx, row) in on_show_history(&service).iter().enumerate() {
            println!("{:>3}. {}", idx + 1, row.summary());
        }
    }

    Ok(())
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}

fn positional_args() -> Vec<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if arg == "--season" || arg == "--model" {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.clone());
    }
    out
}

fn parse_string_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && !raw.trim().is_empty()
        {
            return Some(raw.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
