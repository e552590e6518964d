use serde::Serialize;

use crate::cell::{Grid, clean_display, is_blank_values, pad_or_trim, trim_trailing_empty};
use crate::classifier::{is_highlighted_header_row, is_total_text};
use crate::error::ShapeError;

/// Default column bound, A to Z.
pub const DEFAULT_MAX_COLS: usize = 26;
pub const DEFAULT_MAX_ROWS: usize = 100;

/// How the header row of a plain value grid is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSelection {
    /// First filled row with at least two filled cells, else the first filled row.
    Auto,
    /// Zero-based row index.
    Index(usize),
}

impl HeaderSelection {
    /// Reads a request value: absent, empty or the literal `"null"` mean
    /// "not specified" and yield `None`.
    pub fn parse(raw: Option<&str>) -> Result<Option<Self>, ShapeError> {
        let Some(raw) = raw.map(str::trim) else {
            return Ok(None);
        };
        if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        raw.parse::<usize>()
            .map(|idx| Some(HeaderSelection::Index(idx)))
            .map_err(|_| ShapeError::InvalidParameter {
                name: "header_row_idx",
                value: raw.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_rows: usize,
    pub max_cols: usize,
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds {
            max_rows: DEFAULT_MAX_ROWS,
            max_cols: DEFAULT_MAX_COLS,
        }
    }
}

/// Headers and rows of a single-table sheet.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    pub total_columns: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title_rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totals: Option<Vec<String>>,
}

impl SheetData {
    fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        SheetData {
            total_rows: rows.len(),
            total_columns: headers.len(),
            headers,
            rows,
            title_rows: Vec::new(),
            totals: None,
        }
    }
}

/// A sheet whose header row is marked by the highlight background.
#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct HighlightedSheet {
    pub title_rows: Vec<Vec<String>>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn filled(row: &[String]) -> usize {
    row.iter().filter(|c| !clean_display(c).is_empty()).count()
}

pub fn detect_header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .position(|row| filled(row) >= 2)
        .or_else(|| rows.iter().position(|row| filled(row) > 0))
}

fn trimmed_headers(row: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = row.iter().map(|h| h.trim().to_string()).collect();
    trim_trailing_empty(&mut headers);
    headers
}

fn is_total_values(row: &[String]) -> bool {
    row.iter()
        .map(|c| clean_display(c))
        .find(|c| !c.is_empty())
        .is_some_and(|c| is_total_text(&c))
}

/// Cuts a plain value grid down to `bounds`, picks the header row, and keeps
/// the filled rows below it, each padded or trimmed to the header width.
///
/// A trailing total row is reported separately in `totals`. Nothing here
/// fails: an empty grid or an out-of-range header index yields empty data.
pub fn shape_values(values: &[Vec<String>], header: HeaderSelection, bounds: Bounds) -> SheetData {
    let bounded: Vec<Vec<String>> = values
        .iter()
        .take(bounds.max_rows)
        .map(|row| pad_or_trim(row, bounds.max_cols))
        .collect();

    let header_idx = match header {
        HeaderSelection::Auto => detect_header_row(&bounded),
        HeaderSelection::Index(idx) => Some(idx).filter(|idx| *idx < bounded.len()),
    };
    let Some(header_idx) = header_idx else {
        return SheetData::default();
    };

    let headers = trimmed_headers(&bounded[header_idx]);
    let num_cols = headers.len();

    let mut rows: Vec<Vec<String>> = bounded[header_idx + 1..]
        .iter()
        .map(|row| pad_or_trim(row, num_cols))
        .filter(|row| !is_blank_values(row))
        .collect();
    let totals = match rows.last() {
        Some(last) if is_total_values(last) => rows.pop(),
        _ => None,
    };

    let mut data = SheetData::new(headers, rows);
    data.totals = totals;
    data.title_rows = bounded[..header_idx]
        .iter()
        .filter(|row| !is_blank_values(row))
        .map(|row| pad_or_trim(row, num_cols))
        .collect();
    data
}

/// Fixed layout: `title_count` title rows at the top, the header at
/// `header_index`, data below it. Blank header names are dropped.
///
/// A header index past the last row yields empty data; a header row that
/// exists but holds no names is an error.
pub fn shape_titled(
    values: &[Vec<String>],
    title_count: usize,
    header_index: usize,
    max_cols: usize,
) -> Result<SheetData, ShapeError> {
    let Some(header_row) = values.get(header_index) else {
        return Ok(SheetData::default());
    };

    let headers: Vec<String> = header_row
        .iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect();
    let num_cols = headers.len();
    if num_cols == 0 {
        return Err(ShapeError::EmptyHeader);
    }

    let title_rows = values
        .iter()
        .take(title_count)
        .map(|row| pad_or_trim(&pad_or_trim(row, max_cols), num_cols))
        .collect();
    let rows = values
        .iter()
        .skip(header_index + 1)
        .filter(|row| !is_blank_values(row))
        .map(|row| pad_or_trim(row, num_cols))
        .collect();

    let mut data = SheetData::new(headers, rows);
    data.title_rows = title_rows;
    Ok(data)
}

/// Header is the first row whose filled cells all carry the highlight color
/// (row 0 when none does); rows above it are titles, rows below are data.
/// An empty grid yields an empty sheet.
pub fn shape_highlighted(grid: &Grid) -> HighlightedSheet {
    if grid.is_empty() {
        return HighlightedSheet::default();
    }

    let width = grid.rows.iter().map(Vec::len).max().unwrap_or(0);
    let padded: Vec<Vec<String>> = grid
        .values()
        .iter()
        .map(|row| pad_or_trim(row, width))
        .collect();

    let header_idx = grid
        .rows
        .iter()
        .position(|row| is_highlighted_header_row(row))
        .unwrap_or(0);
    log::debug!("Highlighted header row at {}", header_idx);

    HighlightedSheet {
        title_rows: padded[..header_idx].to_vec(),
        headers: padded[header_idx].clone(),
        rows: padded[header_idx + 1..].to_vec(),
    }
}
