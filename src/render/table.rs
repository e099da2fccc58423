use scraper::{ElementRef, Html, Selector};

use crate::error::ScrapeError;
use crate::mapper::clean_text;
use crate::types::TableSnapshot;

fn parse_selector(s: &str) -> Result<Selector, ScrapeError> {
    Selector::parse(s).map_err(|e| ScrapeError::InvalidSelector {
        selector: s.to_string(),
        reason: e.to_string(),
    })
}

pub fn validate_selector(s: &str) -> Result<(), ScrapeError> {
    parse_selector(s).map(|_| ())
}

pub fn has_match(html: &str, selector: &str) -> Result<bool, ScrapeError> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(html);
    let found = doc.select(&sel).next().is_some();
    Ok(found)
}

/// Reads the first element matching `table_selector` as a header row plus
/// body rows. Cell text is whitespace-normalized.
pub fn parse_table(html: &str, table_selector: &str) -> Result<TableSnapshot, ScrapeError> {
    let table_sel = parse_selector(table_selector)?;
    let head_row_sel = parse_selector("thead > tr")?;
    let body_row_sel = parse_selector("tbody > tr")?;

    let doc = Html::parse_document(html);
    let table = doc
        .select(&table_sel)
        .next()
        .ok_or_else(|| ScrapeError::TableNotFound(table_selector.to_string()))?;

    let header_row = table
        .select(&head_row_sel)
        .next()
        .ok_or_else(|| ScrapeError::Evaluation("table has no header row".to_string()))?;
    let headers = row_cells(header_row);

    let rows = table.select(&body_row_sel).map(row_cells).collect();

    Ok(TableSnapshot { headers, rows })
}

fn row_cells(row: ElementRef<'_>) -> Vec<String> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .map(|cell| clean_text(&cell.text().collect::<String>()))
        .collect()
}
