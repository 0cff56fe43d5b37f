/// Table locator heuristics.
///
/// The sensor page is an ASP.NET grid whose id, classes and wrapping have
/// changed more than once. Rules are tried from most to least specific:
///
/// 1. `<table id="{table_id}">`
/// 2. first table with a class containing a configured keyword
/// 3. first table whose text contains the content keyword
/// 4. first table with more than `min_rows` rows
///
/// Rows and cells are always resolved against their *owning* table, so a
/// level value wrapped in a nested table is never mistaken for a row of
/// the outer grid.

use scraper::{ElementRef, Html};
use std::fmt;

use crate::config::LocatorConfig;

/// Which rule found the table. Indices are 1-based document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateMethod {
    ById(String),
    ByClass { keyword: String },
    ByContent { keyword: String, index: usize },
    ByRowCount { index: usize, rows: usize },
}

impl fmt::Display for LocateMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateMethod::ById(id) => write!(f, "id='{}'", id),
            LocateMethod::ByClass { keyword } => write!(f, "class containing '{}'", keyword),
            LocateMethod::ByContent { keyword, index } => {
                write!(f, "table containing '{}' text (table {})", keyword, index)
            }
            LocateMethod::ByRowCount { index, rows } => {
                write!(f, "table with {} rows (table {})", rows, index)
            }
        }
    }
}

/// A located table and the rule that matched it.
#[derive(Debug, Clone)]
pub struct Located<'a> {
    pub table: ElementRef<'a>,
    pub method: LocateMethod,
}

// ---------------------------------------------------------------------------
// DOM helpers
// ---------------------------------------------------------------------------

/// Descendant elements (including `root` itself) with the given tag name.
pub fn elements_named<'a>(root: ElementRef<'a>, name: &'a str) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    root.descendants()
        .filter_map(ElementRef::wrap)
        .filter(move |el| el.value().name() == name)
}

/// Nearest enclosing `<table>` of an element.
fn owning_table<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
}

/// Rows that belong to `table` itself, not to tables nested inside it.
pub fn own_rows<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    elements_named(table, "tr")
        .filter(|row| owning_table(*row).map(|t| t.id()) == Some(table.id()))
        .collect()
}

/// Direct `<td>` children of a row.
pub fn data_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "td")
        .collect()
}

/// Direct `<td>` and `<th>` children of a row.
pub fn all_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "td" | "th"))
        .collect()
}

/// Concatenated, trimmed text content.
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Finds the table holding the readings.
pub fn locate_table<'a>(doc: &'a Html, locator: &LocatorConfig) -> Option<Located<'a>> {
    let tables: Vec<ElementRef<'a>> = elements_named(doc.root_element(), "table").collect();

    if let Some(table) = tables
        .iter()
        .find(|t| t.value().id() == Some(locator.table_id.as_str()))
    {
        return Some(Located { table: *table, method: LocateMethod::ById(locator.table_id.clone()) });
    }

    for keyword in &locator.class_keywords {
        let needle = keyword.to_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(table) = tables
            .iter()
            .find(|t| t.value().classes().any(|c| c.to_lowercase().contains(&needle)))
        {
            return Some(Located {
                table: *table,
                method: LocateMethod::ByClass { keyword: keyword.clone() },
            });
        }
    }

    let needle = locator.content_keyword.to_lowercase();
    if !needle.is_empty() {
        if let Some((i, table)) = tables
            .iter()
            .enumerate()
            .find(|(_, t)| t.text().any(|s| s.to_lowercase().contains(&needle)))
        {
            return Some(Located {
                table: *table,
                method: LocateMethod::ByContent {
                    keyword: locator.content_keyword.clone(),
                    index: i + 1,
                },
            });
        }
    }

    tables.iter().enumerate().find_map(|(i, t)| {
        let rows = own_rows(*t).len();
        (rows > locator.min_rows).then(|| Located {
            table: *t,
            method: LocateMethod::ByRowCount { index: i + 1, rows },
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::fixtures::*;

    fn locate(html: &str) -> Option<(LocateMethod, usize)> {
        let doc = Html::parse_document(html);
        locate_table(&doc, &LocatorConfig::default()).map(|l| (l.method, own_rows(l.table).len()))
    }

    #[test]
    fn test_locates_by_id_first() {
        let (method, rows) = locate(fixture_gridview_page()).expect("grid should be found");
        assert_eq!(method, LocateMethod::ById("GridView1".to_string()));
        assert_eq!(rows, 4, "header + three readings; nested rows excluded");
    }

    #[test]
    fn test_falls_back_to_class_keyword() {
        let (method, _) = locate(fixture_class_grid_page()).expect("class rule should match");
        assert_eq!(method, LocateMethod::ByClass { keyword: "grid".to_string() });
    }

    #[test]
    fn test_class_keywords_tried_in_order() {
        let html = r#"<table class="data-table"><tr><td>x</td><td>1</td></tr></table>"#;
        let (method, _) = locate(html).expect("second keyword should match");
        assert_eq!(method, LocateMethod::ByClass { keyword: "table".to_string() });
    }

    #[test]
    fn test_falls_back_to_content_keyword() {
        let (method, _) = locate(fixture_keyword_page()).expect("content rule should match");
        assert_eq!(
            method,
            LocateMethod::ByContent { keyword: "water level".to_string(), index: 2 }
        );
    }

    #[test]
    fn test_falls_back_to_row_count() {
        let (method, rows) = locate(fixture_large_table_page()).expect("row rule should match");
        assert_eq!(method, LocateMethod::ByRowCount { index: 2, rows: 6 });
        assert_eq!(rows, 6);
    }

    #[test]
    fn test_row_threshold_is_strict() {
        let mut locator = LocatorConfig::default();
        locator.min_rows = 6;
        let doc = Html::parse_document(fixture_large_table_page());
        assert!(locate_table(&doc, &locator).is_none(), "6 rows is not more than 6");
    }

    #[test]
    fn test_no_table_found() {
        assert!(locate(fixture_no_table_page()).is_none());
    }

    #[test]
    fn test_custom_table_id() {
        let mut locator = LocatorConfig::default();
        locator.table_id = "gvSensors".to_string();
        let html = r#"<table id="gvSensors"><tr><td>a</td><td>1</td></tr></table>"#;
        let doc = Html::parse_document(html);
        let located = locate_table(&doc, &locator).expect("custom id should match");
        assert_eq!(located.method, LocateMethod::ById("gvSensors".to_string()));
    }

    #[test]
    fn test_data_cells_skip_nested_cells() {
        let doc = Html::parse_document(fixture_gridview_page());
        let located = locate_table(&doc, &LocatorConfig::default()).expect("grid present");
        let rows = own_rows(located.table);

        let cells = data_cells(rows[1]);
        assert_eq!(cells.len(), 3, "only the row's own cells");
        assert_eq!(cell_text(cells[0]), "AJWA DAM");
        assert!(data_cells(rows[0]).is_empty(), "header row uses th");
        assert_eq!(all_cells(rows[0]).len(), 3);
    }

    #[test]
    fn test_method_display_matches_log_wording() {
        assert_eq!(LocateMethod::ById("GridView1".into()).to_string(), "id='GridView1'");
        assert_eq!(
            LocateMethod::ByRowCount { index: 3, rows: 12 }.to_string(),
            "table with 12 rows (table 3)"
        );
    }
}
