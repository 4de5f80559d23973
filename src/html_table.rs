use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::raw_table::{GroupedColumn, HeaderLayout, RawStatTable};

fn selector(raw: &str) -> Selector {
    Selector::parse(raw).unwrap_or_else(|err| panic!("invalid selector {raw}: {err:?}"))
}

static TABLE: Lazy<Selector> = Lazy::new(|| selector("table"));
static THEAD_ROW: Lazy<Selector> = Lazy::new(|| selector("thead > tr"));
static TBODY_ROW: Lazy<Selector> = Lazy::new(|| selector("tbody > tr"));
static CELL: Lazy<Selector> = Lazy::new(|| selector("th, td"));
static CAPTION: Lazy<Selector> = Lazy::new(|| selector("caption"));

/// Repeated in-body header rows and spacers carry no team data.
const SKIPPED_ROW_CLASSES: [&str; 3] = ["thead", "over_header", "spacer"];

pub fn parse_tables(html: &str) -> Vec<RawStatTable> {
    let document = Html::parse_document(html);
    document
        .select(&TABLE)
        .enumerate()
        .map(|(pos, table)| parse_table(pos, table))
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn colspan(cell: ElementRef<'_>) -> usize {
    cell.value()
        .attr("colspan")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(1)
        .max(1)
}

fn parse_table(pos: usize, table: ElementRef<'_>) -> RawStatTable {
    let name = table
        .select(&CAPTION)
        .next()
        .map(cell_text)
        .filter(|c| !c.is_empty())
        .or_else(|| table.value().attr("id").map(str::to_string))
        .unwrap_or_else(|| format!("table_{pos}"));

    let header_rows: Vec<ElementRef<'_>> = table.select(&THEAD_ROW).collect();
    let header = match header_rows.as_slice() {
        [] => HeaderLayout::Flat(Vec::new()),
        [leaf] => HeaderLayout::Flat(leaf.select(&CELL).map(cell_text).collect()),
        [.., over, leaf] => {
            let mut groups: Vec<Option<String>> = Vec::new();
            for cell in over.select(&CELL) {
                let text = cell_text(cell);
                let group = if text.is_empty() { None } else { Some(text) };
                for _ in 0..colspan(cell) {
                    groups.push(group.clone());
                }
            }
            HeaderLayout::Grouped(
                leaf.select(&CELL)
                    .map(cell_text)
                    .enumerate()
                    .map(|(idx, name)| GroupedColumn {
                        group: groups.get(idx).cloned().flatten(),
                        name,
                    })
                    .collect(),
            )
        }
    };

    let rows = table
        .select(&TBODY_ROW)
        .filter(|row| {
            row.value()
                .classes()
                .all(|class| !SKIPPED_ROW_CLASSES.contains(&class))
        })
        .map(|row| row.select(&CELL).map(cell_text).collect::<Vec<_>>())
        .filter(|cells| !cells.is_empty())
        .collect();

    RawStatTable { name, header, rows }
}
