/// HTML table extraction.
///
/// Turns a fetched page into `Reading`s:
/// - `locate`   — finds the readings table through a chain of heuristics
/// - `fixtures` (test only) — representative sensor pages
///
/// Row rules:
/// - a data row is a row of the located table with at least two `<td>`s
/// - location is the first cell's text; rows without one are skipped
/// - water level is the first cell of a table nested in the second cell,
///   or the second cell's own text when nothing is nested
/// - date/time follows the same rule in the third cell; a missing, empty
///   or purely numeric value is replaced with the current wall-clock time

pub mod fixtures;
pub mod locate;

use chrono::NaiveDateTime;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::config::LocatorConfig;
use crate::model::{Reading, ScrapeError, FALLBACK_DATETIME_FORMAT};
pub use locate::{locate_table, LocateMethod};
use locate::{all_cells, cell_text, data_cells, elements_named, own_rows};

static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\d.]+$").expect("numeric pattern is valid"));

/// Longest cell preview written to the structure log.
const PREVIEW_CHARS: usize = 50;

/// Result of extracting one page.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub readings: Vec<Reading>,
    pub method: LocateMethod,
    /// Rows that qualified as data rows (some may still have been skipped).
    pub data_rows: usize,
}

/// Extracts readings from a page.
///
/// `now` stands in for rows without a usable timestamp.
///
/// # Errors
/// - `ScrapeError::TableNotFound`: no locator rule matched.
/// - `ScrapeError::NoDataRows`: the table has no row with two data cells.
/// - `ScrapeError::NoData`: data rows existed but none produced a reading.
pub fn extract_readings(
    html: &str,
    locator: &LocatorConfig,
    now: NaiveDateTime,
) -> Result<Extraction, ScrapeError> {
    let doc = Html::parse_document(html);

    let located = locate_table(&doc, locator).ok_or(ScrapeError::TableNotFound)?;
    info!(method = %located.method, "found table");
    describe_header_rows(located.table);

    let rows: Vec<ElementRef<'_>> = own_rows(located.table)
        .into_iter()
        .filter(|row| data_cells(*row).len() >= 2)
        .collect();

    if rows.is_empty() {
        warn!("no data rows found in the table");
        return Err(ScrapeError::NoDataRows);
    }
    info!(rows = rows.len(), "found data rows");

    let fallback = now.format(FALLBACK_DATETIME_FORMAT).to_string();
    let mut readings = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        match extract_row(*row, &fallback) {
            Some(reading) => {
                debug!(
                    row = i + 1,
                    location = %reading.location,
                    level = %reading.water_level,
                    date_time = %reading.date_time,
                    "extracted row"
                );
                readings.push(reading);
            }
            None => warn!(row = i + 1, "row has no location, skipping"),
        }
    }

    if readings.is_empty() {
        return Err(ScrapeError::NoData);
    }

    info!(count = readings.len(), method = %located.method, "extracted readings");
    Ok(Extraction { readings, method: located.method, data_rows: rows.len() })
}

/// Builds a reading from one data row; `None` if the row is too short or
/// has no location name (spacer and footer rows).
fn extract_row(row: ElementRef<'_>, fallback: &str) -> Option<Reading> {
    let cells = data_cells(row);
    if cells.len() < 2 {
        return None;
    }

    let location = cell_text(cells[0]);
    if location.is_empty() {
        return None;
    }
    let water_level = nested_or_own_text(cells[1]);

    let date_time = match cells.get(2).map(|c| nested_or_own_text(*c)) {
        Some(text) if NUMERIC.is_match(&text) => {
            info!(location = %location, "third column appears to be numeric, not date/time");
            fallback.to_string()
        }
        Some(text) if !text.is_empty() => text,
        _ => fallback.to_string(),
    };

    Some(Reading { location, water_level, date_time })
}

/// Text of the first cell of a table nested in `cell`, else `cell`'s text.
///
/// A nested table with no cells yields an empty string.
fn nested_or_own_text(cell: ElementRef<'_>) -> String {
    match elements_named(cell, "table").next() {
        Some(nested) => elements_named(nested, "td")
            .next()
            .map(cell_text)
            .unwrap_or_default(),
        None => cell_text(cell),
    }
}

/// Logs the first two rows of the located table at debug level.
pub fn describe_header_rows(table: ElementRef<'_>) {
    for (i, row) in own_rows(table).into_iter().take(2).enumerate() {
        let cells = all_cells(row);
        debug!(row = i + 1, columns = cells.len(), "header row");
        for (j, cell) in cells.into_iter().enumerate() {
            let text: String = cell_text(cell).chars().take(PREVIEW_CHARS).collect();
            debug!(column = j, text = %text, "header column");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 8, 12)
            .and_then(|d| d.and_hms_opt(11, 30, 0))
            .expect("valid test timestamp")
    }

    fn extract(html: &str) -> Result<Extraction, ScrapeError> {
        extract_readings(html, &LocatorConfig::default(), now())
    }

    #[test]
    fn test_gridview_page_extracts_all_rows() {
        let extraction = extract(fixture_gridview_page()).expect("grid page should extract");

        assert_eq!(extraction.method, LocateMethod::ById("GridView1".to_string()));
        assert_eq!(extraction.data_rows, 3, "header row has no td cells");
        assert_eq!(
            extraction.readings,
            vec![
                Reading::new("AJWA DAM", "211.45", "12-08-2025 10:15:00"),
                Reading::new("AKOTA BRIDGE", "9.80", "12-08-2025 10:10:00"),
                Reading::new("KALA GHODA", "7.25", "2025-08-12 11:30:00"),
            ]
        );
    }

    #[test]
    fn test_plain_cells_without_nesting() {
        let extraction = extract(fixture_class_grid_page()).expect("class page should extract");
        assert_eq!(extraction.readings.len(), 2);
        assert_eq!(extraction.readings[0], Reading::new("SAMA HARNI BRIDGE", "12.10", "12-08-2025 09:00:00"));
    }

    #[test]
    fn test_two_column_rows_get_wall_clock_time() {
        let extraction = extract(fixture_keyword_page()).expect("keyword page should extract");
        assert_eq!(extraction.readings.len(), 2);
        assert!(extraction.readings.iter().all(|r| r.date_time == "2025-08-12 11:30:00"));
        assert_eq!(extraction.readings[1].water_level, "5.1");
    }

    #[test]
    fn test_numeric_third_column_is_replaced() {
        let extraction = extract(fixture_numeric_third_column_page()).expect("should extract");
        let reading = &extraction.readings[0];
        assert_eq!(reading.water_level, "180.5");
        assert_eq!(reading.date_time, "2025-08-12 11:30:00", "180.25 is not a timestamp");
    }

    #[test]
    fn test_row_count_fallback_extracts() {
        let extraction = extract(fixture_large_table_page()).expect("should extract");
        assert_eq!(extraction.readings.len(), 6);
        assert_eq!(extraction.readings[5].location, "S6");
    }

    #[test]
    fn test_no_table_is_table_not_found() {
        assert!(matches!(extract(fixture_no_table_page()), Err(ScrapeError::TableNotFound)));
    }

    #[test]
    fn test_header_only_table_has_no_data_rows() {
        assert!(matches!(extract(fixture_header_only_page()), Err(ScrapeError::NoDataRows)));
    }

    #[test]
    fn test_rows_without_location_are_skipped() {
        let html = r#"<table id="GridView1">
            <tr><td>AJWA DAM</td><td>211.45</td></tr>
            <tr><td>  </td><td>Page 1 of 2</td></tr>
        </table>"#;
        let extraction = extract(html).expect("first row is usable");
        assert_eq!(extraction.data_rows, 2);
        assert_eq!(extraction.readings.len(), 1);
        assert_eq!(extraction.readings[0].location, "AJWA DAM");
    }

    #[test]
    fn test_only_blank_rows_is_no_data() {
        let html = r#"<table id="GridView1">
            <tr><td></td><td>&nbsp;</td></tr>
            <tr><td></td><td>Page 1</td></tr>
        </table>"#;
        assert!(matches!(extract(html), Err(ScrapeError::NoData)));
    }

    #[test]
    fn test_empty_nested_table_yields_empty_level() {
        let html = r#"<table id="GridView1">
            <tr><td>VADSAR BRIDGE</td><td><table></table></td><td>12-08-2025 08:00:00</td></tr>
        </table>"#;
        let extraction = extract(html).expect("row should still be kept");
        assert_eq!(extraction.readings[0].water_level, "");
        assert_eq!(extraction.readings[0].date_time, "12-08-2025 08:00:00");
    }

    #[test]
    fn test_timestamp_with_digits_and_separators_is_kept() {
        let html = r#"<table id="GridView1">
            <tr><td>AJWA DAM</td><td>210.0</td><td>2025-08-12 07:45</td></tr>
        </table>"#;
        let extraction = extract(html).expect("should extract");
        assert_eq!(extraction.readings[0].date_time, "2025-08-12 07:45");
    }

    #[test]
    fn test_location_whitespace_is_trimmed() {
        let html = "<table id=\"GridView1\"><tr><td>\n   MANGAL PANDEY BRIDGE \t</td><td> 4.5 </td></tr></table>";
        let extraction = extract(html).expect("should extract");
        assert_eq!(extraction.readings[0].location, "MANGAL PANDEY BRIDGE");
        assert_eq!(extraction.readings[0].water_level, "4.5");
    }
}
