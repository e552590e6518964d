//! Row predicates driven by cell formatting.
//!
//! Colors are compared against named [`Swatch`] constants. A cell without
//! formatting metadata reads as black text on a white background, so missing
//! data never classifies a row as a title or total.

use crate::cell::{Cell, Grid, Rgb, clean_display};

/// A reference color and the per-channel distance a cell may drift from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Swatch {
    pub rgb: Rgb,
    pub tolerance: Rgb,
}

impl Swatch {
    pub const fn uniform(rgb: Rgb, tolerance: f64) -> Self {
        Swatch {
            rgb,
            tolerance: Rgb::new(tolerance, tolerance, tolerance),
        }
    }

    pub fn matches(&self, color: &Rgb) -> bool {
        (color.red - self.rgb.red).abs() < self.tolerance.red
            && (color.green - self.rgb.green).abs() < self.tolerance.green
            && (color.blue - self.rgb.blue).abs() < self.tolerance.blue
    }
}

pub const TITLE_TEXT: Swatch = Swatch::uniform(Rgb::WHITE, 0.1);
pub const TITLE_BACKGROUND: Swatch = Swatch::uniform(Rgb::BLACK, 0.2);
pub const TOTAL_BACKGROUND: Swatch = Swatch {
    rgb: Rgb::new(1.0, 1.0, 0.0),
    tolerance: Rgb::new(0.1, 0.1, 0.2),
};
pub const DATE_TEXT: Swatch = Swatch::uniform(Rgb::new(1.0, 0.0, 0.0), 0.3);
pub const PLAIN_BACKGROUND: Swatch = Swatch::uniform(Rgb::WHITE, 0.1);
pub const KPI_HEADER: Swatch = Swatch::uniform(Rgb::new(0.988, 0.898, 0.804), 0.05);
pub const CHART_HEADER: Swatch = Swatch::uniform(Rgb::new(0.788, 0.855, 0.973), 0.05);
pub const BOTH_HEADER: Swatch = Swatch::uniform(Rgb::new(0.576, 0.769, 0.490), 0.05);
/// `#ff9900`
pub const HIGHLIGHTED_HEADER: Swatch = Swatch::uniform(Rgb::new(1.0, 0.6, 0.0), 0.01);

/// Marathi "total" marker used by the source sheets.
pub const TOTAL_MARKER: &str = "एकूण";
pub const TOTAL_MARKERS: &[&str] = &[TOTAL_MARKER, "total"];

pub const UNTITLED: &str = "Untitled";
pub const NO_DATE: &str = "N/A";

pub fn is_empty_row(row: &[Cell]) -> bool {
    row.iter().all(Cell::is_blank)
}

/// Number of cells with visible text.
pub fn filled_cells(row: &[Cell]) -> usize {
    row.iter().filter(|c| !c.is_blank()).count()
}

/// White text on a near-black background in any formatted cell.
pub fn is_title_row(row: &[Cell]) -> bool {
    row.iter().any(|cell| match &cell.format {
        Some(format) => {
            TITLE_TEXT.matches(&format.foreground_or_default())
                && TITLE_BACKGROUND.matches(&format.background_or_default())
        }
        None => false,
    })
}

/// A single filled cell, standing in for a title row in unformatted grids.
pub fn is_banner_row(row: &[Cell]) -> bool {
    filled_cells(row) == 1
}

pub fn is_bold_row(row: &[Cell]) -> bool {
    row.iter().any(|cell| cell.is_bold() && !cell.is_blank())
}

pub fn is_yellow_cell(cell: &Cell) -> bool {
    cell.format
        .as_ref()
        .and_then(|f| f.background)
        .is_some_and(|bg| TOTAL_BACKGROUND.matches(&bg))
}

pub fn is_yellow_row(row: &[Cell]) -> bool {
    row.iter().any(is_yellow_cell)
}

pub fn is_total_text(text: &str) -> bool {
    let lowered = text.to_lowercase();
    TOTAL_MARKERS.iter().any(|marker| lowered.contains(marker))
}

pub fn has_total_marker(row: &[Cell]) -> bool {
    row.iter().any(|cell| is_total_text(&cell.value))
}

/// Yellow background together with a total marker somewhere in the row.
pub fn is_total_row(row: &[Cell]) -> bool {
    is_yellow_row(row) && has_total_marker(row)
}

/// Total detection for unformatted grids: the first filled cell is a marker.
pub fn is_plain_total_row(row: &[Cell]) -> bool {
    row.iter()
        .find(|c| !c.is_blank())
        .is_some_and(|c| is_total_text(&c.value))
}

pub fn starts_with_category(row: &[Cell], category: &str) -> bool {
    let target = clean_display(category).to_lowercase();
    !target.is_empty()
        && row
            .first()
            .is_some_and(|c| clean_display(&c.value).to_lowercase() == target)
}

/// Every filled cell sits on the highlight color, and at least one does.
pub fn is_highlighted_header_row(row: &[Cell]) -> bool {
    let mut matched = false;
    for cell in row {
        let highlighted = cell
            .format
            .as_ref()
            .and_then(|f| f.background)
            .is_some_and(|bg| HIGHLIGHTED_HEADER.matches(&bg));
        if highlighted {
            matched = true;
        } else if !cell.is_blank() {
            return false;
        }
    }
    matched
}

/// First filled cell of the row, or `"Untitled"`.
pub fn title_text(row: &[Cell]) -> String {
    row.iter()
        .map(|c| clean_display(&c.value))
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

/// The report date: the first red-on-white cell anywhere in the grid.
pub fn find_highlighted_date(grid: &Grid) -> String {
    grid.rows
        .iter()
        .flatten()
        .find(|cell| {
            cell.format.as_ref().is_some_and(|f| {
                f.foreground.is_some_and(|fg| DATE_TEXT.matches(&fg))
                    && PLAIN_BACKGROUND.matches(&f.background_or_default())
            })
        })
        .map(|cell| cell.value.clone())
        .unwrap_or_else(|| NO_DATE.to_string())
}
