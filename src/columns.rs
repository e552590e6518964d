//! Tables whose header cells are color-coded by role.
//!
//! Sheets of this kind put a serial number in column 0 and a row label in
//! column 1; every later header cell may be tinted to say whether its column
//! feeds a KPI total, a chart, or both.

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Grid, clean_display, pad_or_trim, row_values, try_parse_number};
use crate::classifier::{
    BOTH_HEADER, CHART_HEADER, KPI_HEADER, is_bold_row, is_empty_row, is_yellow_row, title_text,
};
use crate::graph::{Chart, prepare_charts};

/// Columns before this index are the serial and label columns.
pub const FIRST_VALUE_COLUMN: usize = 2;
pub const LABEL_COLUMN: usize = 1;
pub const UNTITLED_TABLE: &str = "Untitled Table";

/// Header names that always feed a chart, whatever their color.
pub const DEFAULT_CHART_HEADERS: &[&str] = &[
    "सर्वोच्च न्यायालय",
    "उच्च न्यायालय",
    "दिवाणी न्यायालय",
    "अवमान याचिका",
    "मॅट",
    "इतर",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Kpi,
    Chart,
    Both,
}

impl ColumnRole {
    pub fn is_kpi(role: Option<ColumnRole>) -> bool {
        matches!(role, Some(ColumnRole::Kpi | ColumnRole::Both))
    }

    pub fn is_chart(role: Option<ColumnRole>) -> bool {
        matches!(role, Some(ColumnRole::Chart | ColumnRole::Both))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub role: Option<ColumnRole>,
    pub col_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpi {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypedTable {
    pub title: String,
    pub headers: Vec<String>,
    pub header_types: Vec<HeaderColumn>,
    pub rows: Vec<Vec<String>>,
    pub totals: Option<Vec<String>>,
    pub kpis: Vec<Kpi>,
    pub charts: Vec<Chart>,
}

fn role_from_color(cell: &Cell) -> Option<ColumnRole> {
    let bg = cell.format.as_ref().and_then(|f| f.background)?;
    if KPI_HEADER.matches(&bg) {
        Some(ColumnRole::Kpi)
    } else if CHART_HEADER.matches(&bg) {
        Some(ColumnRole::Chart)
    } else if BOTH_HEADER.matches(&bg) {
        Some(ColumnRole::Both)
    } else {
        None
    }
}

/// Tags every filled header cell from column 2 on by its background color.
/// Names on `chart_headers` are charted too: a KPI column becomes `both`.
pub fn headers_with_roles(row: &[Cell], chart_headers: &[&str]) -> Vec<HeaderColumn> {
    row.iter()
        .enumerate()
        .skip(FIRST_VALUE_COLUMN)
        .filter_map(|(col_index, cell)| {
            let name = clean_display(&cell.value);
            if name.is_empty() {
                return None;
            }
            let mut role = role_from_color(cell);
            if chart_headers.contains(&name.as_str()) {
                role = match role {
                    Some(ColumnRole::Kpi | ColumnRole::Both) => Some(ColumnRole::Both),
                    _ => Some(ColumnRole::Chart),
                };
            }
            Some(HeaderColumn {
                name,
                role,
                col_index,
            })
        })
        .collect()
}

fn is_zero_or_blank(value: &str) -> bool {
    let value = clean_display(value);
    value.is_empty() || value == "0" || value == "0.0"
}

/// Serial and label cells (padded when the row is shorter) followed by the
/// kept columns, so each kept value lands at its renumbered index.
fn select_columns(row: &[String], keep: &[usize]) -> Vec<String> {
    let mut out = pad_or_trim(row, FIRST_VALUE_COLUMN);
    for idx in keep {
        out.push(row.get(*idx).cloned().unwrap_or_default());
    }
    out
}

/// Drops columns whose data cells are all blank or zero. The serial and
/// label columns always stay; surviving headers are renumbered to their
/// position in the filtered rows.
pub fn filter_empty_columns(
    headers: &[HeaderColumn],
    rows: &[Vec<String>],
    totals: Option<&[String]>,
) -> (Vec<HeaderColumn>, Vec<Vec<String>>, Option<Vec<String>>) {
    if headers.is_empty() || rows.is_empty() {
        return (headers.to_vec(), Vec::new(), totals.map(<[String]>::to_vec));
    }

    let kept: Vec<&HeaderColumn> = headers
        .iter()
        .filter(|h| {
            rows.iter()
                .any(|row| row.get(h.col_index).is_some_and(|v| !is_zero_or_blank(v)))
        })
        .collect();
    let keep: Vec<usize> = kept.iter().map(|h| h.col_index).collect();

    let filtered_headers = kept
        .iter()
        .enumerate()
        .map(|(i, h)| HeaderColumn {
            name: h.name.clone(),
            role: h.role,
            col_index: FIRST_VALUE_COLUMN + i,
        })
        .collect();
    let filtered_rows = rows.iter().map(|row| select_columns(row, &keep)).collect();
    let filtered_totals = totals.map(|t| select_columns(t, &keep));

    (filtered_headers, filtered_rows, filtered_totals)
}

/// Sums each KPI column over rows with a label, rounded to two decimals.
/// Columns without a single numeric cell are left out.
pub fn calculate_kpis(headers: &[HeaderColumn], rows: &[Vec<String>]) -> Vec<Kpi> {
    headers
        .iter()
        .filter(|h| ColumnRole::is_kpi(h.role))
        .filter_map(|h| {
            let values: Vec<f64> = rows
                .iter()
                .filter(|row| row.get(LABEL_COLUMN).is_some_and(|l| !clean_display(l).is_empty()))
                .filter_map(|row| row.get(h.col_index).and_then(|v| try_parse_number(v)))
                .collect();
            if values.is_empty() {
                return None;
            }
            let total: f64 = values.iter().sum();
            Some(Kpi {
                label: h.name.clone(),
                value: (total * 100.0).round() / 100.0,
            })
        })
        .collect()
}

/// Cuts every bold-headed table out of the grid and computes its KPIs and
/// chart series.
///
/// The title is the nearest filled row above the header that does not belong
/// to the previous table. Data rows run until the next bold or yellow row;
/// a yellow row right there is the totals row.
pub fn extract_typed_tables(grid: &Grid, chart_headers: &[&str]) -> Vec<TypedTable> {
    let rows = &grid.rows;
    let mut tables = Vec::new();
    let mut floor = 0;
    let mut i = 0;

    while i < rows.len() {
        while i < rows.len() && !is_bold_row(&rows[i]) {
            i += 1;
        }
        if i >= rows.len() {
            break;
        }

        let header_index = i;
        let header_types = headers_with_roles(&rows[header_index], chart_headers);
        let title = rows[floor..header_index]
            .iter()
            .rev()
            .find(|row| !is_empty_row(row))
            .map(|row| title_text(row))
            .unwrap_or_else(|| UNTITLED_TABLE.to_string());
        log::debug!(
            "Header row at {}: {} columns, title {:?}",
            header_index,
            header_types.len(),
            title
        );

        i += 1;
        let mut data_rows = Vec::new();
        while i < rows.len() && !is_bold_row(&rows[i]) && !is_yellow_row(&rows[i]) {
            let row = &rows[i];
            let first_blank = row.first().is_none_or(Cell::is_blank);
            if !first_blank && !is_empty_row(row) {
                data_rows.push(row_values(row));
            }
            i += 1;
        }

        let mut totals = None;
        if i < rows.len() && is_yellow_row(&rows[i]) {
            totals = Some(row_values(&rows[i]));
            i += 1;
        }
        floor = i;

        let (header_types, data_rows, totals) =
            filter_empty_columns(&header_types, &data_rows, totals.as_deref());
        let kpis = calculate_kpis(&header_types, &data_rows);
        let charts = prepare_charts(&header_types, &data_rows, chart_headers);

        tables.push(TypedTable {
            title,
            headers: header_types.iter().map(|h| h.name.clone()).collect(),
            header_types,
            rows: data_rows,
            totals,
            kpis,
            charts,
        });
    }

    log::info!("Typed tables found: {}", tables.len());
    tables
}
