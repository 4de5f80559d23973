use std::fs;

use matchup_terminal::PipelineError;
use matchup_terminal::raw_table::{HeaderLayout, RawStatTable, SeasonTables, StatCategory};
use matchup_terminal::source::{HtmlFileSource, SeasonSource, page_path};
use matchup_terminal::synthetic::SyntheticSource;

/// Renders a table the way the stats site does: grouped headers get an
/// `over_header` row with one cell per run of equal groups.
fn render_table(table: &RawStatTable) -> String {
    let mut html = format!("<table><caption>{}</caption><thead>", table.name);
    match &table.header {
        HeaderLayout::Flat(cols) => {
            html.push_str("<tr>");
            for col in cols {
                html.push_str(&format!("<th>{col}</th>"));
            }
            html.push_str("</tr>");
        }
        HeaderLayout::Grouped(cols) => {
            html.push_str(r#"<tr class="over_header">"#);
            let mut idx = 0;
            while idx < cols.len() {
                let group = &cols[idx].group;
                let span = cols[idx..].iter().take_while(|c| &c.group == group).count();
                html.push_str(&format!(
                    r#"<th colspan="{span}">{}</th>"#,
                    group.as_deref().unwrap_or_default()
                ));
                idx += span;
            }
            html.push_str("</tr><tr>");
            for col in cols {
                html.push_str(&format!("<th>{}</th>", col.name));
            }
            html.push_str("</tr>");
        }
    }
    html.push_str("</thead><tbody>");
    for (pos, row) in table.rows.iter().enumerate() {
        if pos == 3 {
            html.push_str(r#"<tr class="thead"><th>Squad</th></tr>"#);
        }
        html.push_str("<tr>");
        for cell in row {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>\n");
    html
}

fn render_page(season: &SeasonTables) -> String {
    let last = StatCategory::ALL.iter().map(|c| c.spec().position).max().unwrap_or(0);
    let mut html = String::from("<html><body>\n");
    for pos in 0..=last {
        let table = if pos == 0 {
            season.summary.clone()
        } else if let Some(category) = StatCategory::ALL.iter().find(|c| c.spec().position == pos) {
            season.category(*category).expect("category").clone()
        } else {
            RawStatTable::flat(&format!("filler_{pos}"), &["Squad"], Vec::new())
        };
        html.push_str(&render_table(&table));
    }
    html.push_str("</body></html>\n");
    html
}

#[test]
fn saved_page_parses_back_into_the_same_season_tables() {
    let expected = SyntheticSource::new(5)
        .fetch_season("2021-2022")
        .expect("synthetic season");
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(page_path(dir.path(), "2021-2022"), render_page(&expected)).expect("write page");

    let parsed = HtmlFileSource::new(dir.path())
        .fetch_season("2021-2022")
        .expect("parse saved page");
    assert_eq!(parsed.season, "2021-2022");
    assert_eq!(parsed.summary, expected.summary);
    assert_eq!(parsed.categories, expected.categories);
}

#[test]
fn truncated_page_is_a_data_quality_error() {
    let season = SyntheticSource::new(5)
        .fetch_season("2021-2022")
        .expect("synthetic season");
    let dir = tempfile::tempdir().expect("tempdir");
    let html = format!("<html><body>{}</body></html>", render_table(&season.summary));
    fs::write(page_path(dir.path(), "2021-2022"), html).expect("write page");

    assert!(matches!(
        HtmlFileSource::new(dir.path()).fetch_season("2021-2022"),
        Err(PipelineError::DataQuality(_))
    ));
}
