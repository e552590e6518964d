//! Splits a flat grid into titled tables.
//!
//! The scan walks the grid once: find a title row, skip the blank rows under
//! it, take the next filled row as the header, then collect filled rows until
//! a total row closes the table. Grids that carry no formatting at all fall
//! back to text cues (a lone-cell banner for the title, a leading "total"
//! marker for the total row).

use serde::{Deserialize, Serialize};

use crate::cell::{Cell, Grid, is_blank_values, pad_or_trim, row_values, trim_trailing_empty};
use crate::classifier::{
    UNTITLED, is_banner_row, is_empty_row, is_plain_total_row, is_title_row, is_total_row,
    title_text,
};

/// One logical table cut out of a grid.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Table {
    pub title: String,
    pub headers: Vec<String>,
    /// Data rows, each exactly `headers.len()` cells wide.
    pub rows: Vec<Vec<String>>,
    pub total: Option<Vec<String>>,
}

impl Table {
    pub fn new(title: impl Into<String>, mut headers: Vec<String>) -> Self {
        for header in headers.iter_mut() {
            *header = header.trim().to_string();
        }
        trim_trailing_empty(&mut headers);
        Table {
            title: title.into(),
            headers,
            rows: Vec::new(),
            total: None,
        }
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn push_row(&mut self, row: &[String]) {
        self.rows.push(pad_or_trim(row, self.column_count()));
    }

    pub fn set_total(&mut self, row: &[String]) {
        self.total = Some(pad_or_trim(row, self.column_count()));
    }

    /// Header, data rows and total row as one flat list of string rows.
    pub fn raw_rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(self.rows.len() + 2);
        rows.push(self.headers.clone());
        rows.extend(self.rows.iter().cloned());
        if let Some(total) = &self.total {
            rows.push(total.clone());
        }
        rows
    }
}

enum State {
    SeekTitle,
    SkipBlank { title: String },
    SeekHeader { title: String },
    CollectRows(Table),
}

fn opens_table(row: &[Cell], styled: bool) -> bool {
    if styled {
        is_title_row(row)
    } else {
        is_banner_row(row)
    }
}

fn closes_table(row: &[Cell], styled: bool) -> bool {
    if styled {
        is_total_row(row)
    } else {
        is_plain_total_row(row)
    }
}

/// Cuts up to `max_tables` tables out of `grid`.
///
/// When no table is found in a non-empty grid, the filled rows are split in
/// half into two placeholder tables instead.
pub fn extract_tables(grid: &Grid, max_tables: usize) -> Vec<Table> {
    let styled = grid.has_formatting();
    let mut tables = Vec::new();
    let mut state = State::SeekTitle;
    let mut i = 0;

    while i < grid.rows.len() && tables.len() < max_tables {
        let row = &grid.rows[i];
        state = match state {
            State::SeekTitle => {
                i += 1;
                if opens_table(row, styled) {
                    let title = title_text(row);
                    log::debug!(
                        "Found title for table {} at row {}: {}",
                        tables.len() + 1,
                        i - 1,
                        title
                    );
                    State::SkipBlank { title }
                } else if !styled && !is_empty_row(row) {
                    // unformatted sheet without a banner: this row is the header
                    State::CollectRows(Table::new(UNTITLED, row_values(row)))
                } else {
                    State::SeekTitle
                }
            }
            State::SkipBlank { title } => {
                if is_empty_row(row) {
                    i += 1;
                    State::SkipBlank { title }
                } else {
                    State::SeekHeader { title }
                }
            }
            State::SeekHeader { title } => {
                i += 1;
                if is_empty_row(row) {
                    State::SeekHeader { title }
                } else if !styled && is_banner_row(row) {
                    // subtitle under the banner
                    log::debug!("Skipping subtitle row {} of table {}", i - 1, tables.len() + 1);
                    State::SeekHeader { title }
                } else {
                    log::debug!("Found header for table {} at row {}", tables.len() + 1, i - 1);
                    State::CollectRows(Table::new(title, row_values(row)))
                }
            }
            State::CollectRows(mut table) => {
                i += 1;
                let values = row_values(row);
                if closes_table(row, styled) {
                    table.set_total(&values);
                    log::debug!(
                        "Found total row for table {} at row {}",
                        tables.len() + 1,
                        i - 1
                    );
                    tables.push(table);
                    State::SeekTitle
                } else {
                    if !is_blank_values(&values) {
                        table.push_row(&values);
                    }
                    State::CollectRows(table)
                }
            }
        };
    }

    if let State::CollectRows(table) = state {
        if tables.len() < max_tables {
            tables.push(table);
        }
    }

    if tables.is_empty() && !grid.is_empty() {
        log::info!("No tables detected, falling back to raw rows split");
        return fallback_split(grid);
    }

    tables
}

fn fallback_split(grid: &Grid) -> Vec<Table> {
    let raw: Vec<Vec<String>> = grid
        .rows
        .iter()
        .filter(|row| !is_empty_row(row))
        .map(|row| row_values(row))
        .collect();
    let (first, second) = raw.split_at(raw.len() / 2);

    [(first, "Table 1 (Fallback)"), (second, "Table 2 (Fallback)")]
        .into_iter()
        .map(|(rows, title)| {
            let mut table = Table::new(title, rows.first().cloned().unwrap_or_default());
            for row in rows.iter().skip(1) {
                table.push_row(row);
            }
            table
        })
        .collect()
}
