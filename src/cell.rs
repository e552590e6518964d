use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref INVISIBLE_REGEX: Regex = Regex::new(r"[\x{200B}\x{200C}\x{200D}\x{FEFF}]").unwrap();
    static ref NUMERIC_NOISE_REGEX: Regex =
        Regex::new(r"[\s,%()\x{200B}\x{200C}\x{200D}\x{FEFF}]").unwrap();
}

/// Normalized (0.0 to 1.0) RGB color as reported by the spreadsheet API.
///
/// The API leaves out channels that are zero, so every channel defaults to 0.0.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Rgb {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Rgb { red, green, blue }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct CellFormat {
    pub background: Option<Rgb>,
    pub foreground: Option<Rgb>,
    pub bold: bool,
}

impl CellFormat {
    /// Background color, white when the sheet does not report one.
    pub fn background_or_default(&self) -> Rgb {
        self.background.unwrap_or(Rgb::WHITE)
    }

    /// Text color, black when the sheet does not report one.
    pub fn foreground_or_default(&self) -> Rgb {
        self.foreground.unwrap_or(Rgb::BLACK)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Cell {
    pub value: String,
    pub format: Option<CellFormat>,
}

impl Cell {
    pub fn plain(value: impl Into<String>) -> Self {
        Cell {
            value: value.into(),
            format: None,
        }
    }

    pub fn styled(value: impl Into<String>, format: CellFormat) -> Self {
        Cell {
            value: value.into(),
            format: Some(format),
        }
    }

    pub fn is_blank(&self) -> bool {
        clean_display(&self.value).is_empty()
    }

    pub fn is_bold(&self) -> bool {
        self.format.as_ref().is_some_and(|f| f.bold)
    }

    pub fn background(&self) -> Rgb {
        self.format
            .as_ref()
            .map_or(Rgb::WHITE, CellFormat::background_or_default)
    }

    pub fn foreground(&self) -> Rgb {
        self.format
            .as_ref()
            .map_or(Rgb::BLACK, CellFormat::foreground_or_default)
    }
}

/// The raw 2-D array of cells fetched from one sheet range.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Grid {
    pub rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Grid { rows }
    }

    /// Builds an unformatted grid from display strings.
    pub fn from_values<R, S>(values: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Grid {
            rows: values
                .into_iter()
                .map(|row| row.into_iter().map(Cell::plain).collect())
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_formatting(&self) -> bool {
        self.rows.iter().flatten().any(|cell| cell.format.is_some())
    }

    /// Display values only, row by row.
    pub fn values(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|row| row_values(row)).collect()
    }
}

pub fn row_values(row: &[Cell]) -> Vec<String> {
    row.iter().map(|cell| cell.value.clone()).collect()
}

/// Trims surrounding whitespace and drops zero-width characters.
pub fn clean_display(s: &str) -> String {
    INVISIBLE_REGEX.replace_all(s.trim(), "").trim().to_string()
}

/// `clean_display`, lowercased; used for header substring matching.
pub fn clean_header(s: &str) -> String {
    clean_display(s).to_lowercase()
}

/// Devanagari digits (U+0966..U+096F) as their ASCII counterparts.
fn ascii_digit(c: char) -> char {
    match c {
        '\u{0966}'..='\u{096F}' => char::from(b'0' + (c as u32 - 0x0966) as u8),
        _ => c,
    }
}

/// Parses a display string as a number, if it is one once thousands
/// separators, percent signs and parentheses are removed. Devanagari digits
/// are accepted.
pub fn try_parse_number(s: &str) -> Option<f64> {
    let cleaned: String = NUMERIC_NOISE_REGEX.replace_all(s, "").chars().map(ascii_digit).collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Total numeric parse: blanks and anything unparseable count as 0.0.
pub fn parse_number(s: &str) -> f64 {
    match try_parse_number(s) {
        Some(v) => v,
        None => {
            if !clean_display(s).is_empty() {
                log::debug!("Non-numeric value treated as 0: {:?}", s);
            }
            0.0
        }
    }
}

/// Pads with empty strings or truncates so the row has exactly `len` cells.
pub fn pad_or_trim(row: &[String], len: usize) -> Vec<String> {
    let mut out: Vec<String> = row.iter().take(len).cloned().collect();
    out.resize(len, String::new());
    out
}

/// Removes trailing blank cells only; interior blanks stay in place.
pub fn trim_trailing_empty(row: &mut Vec<String>) {
    while row.last().is_some_and(|c| c.trim().is_empty()) {
        row.pop();
    }
}

pub fn is_blank_values(row: &[String]) -> bool {
    row.iter().all(|c| clean_display(c).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pad_or_trim() {
        assert_eq!(pad_or_trim(&strings(&["a"]), 3), strings(&["a", "", ""]));
        assert_eq!(pad_or_trim(&strings(&["a", "b", "c"]), 2), strings(&["a", "b"]));

        let once = pad_or_trim(&strings(&["x", "y"]), 4);
        assert_eq!(pad_or_trim(&once, 4), once);
    }

    #[test]
    fn test_trim_trailing_empty_keeps_interior() {
        let mut interior = strings(&["A", "", "B"]);
        trim_trailing_empty(&mut interior);
        assert_eq!(interior.len(), 3);

        let mut trailing = strings(&["A", "B", "", "  "]);
        trim_trailing_empty(&mut trailing);
        assert_eq!(trailing, strings(&["A", "B"]));
    }

    #[test]
    fn test_parse_number_is_total() {
        assert_eq!(parse_number("1,234.5"), 1234.5);
        assert_eq!(parse_number(" 45.2 % "), 45.2);
        assert_eq!(parse_number("(12)"), 12.0);
        assert_eq!(parse_number("\u{200B}7"), 7.0);
        assert_eq!(parse_number("१,२००"), 1200.0);
        assert_eq!(parse_number("४५.५ %"), 45.5);
        assert_eq!(parse_number(""), 0.0);
        assert_eq!(parse_number("n/a"), 0.0);
        assert_eq!(parse_number("NaN"), 0.0);
        assert_eq!(parse_number("inf"), 0.0);
        assert_eq!(try_parse_number("abc"), None);
    }

    #[test]
    fn test_clean_header() {
        assert_eq!(clean_header("  Tal\u{200B}uka Name "), "taluka name");
    }

    #[test]
    fn test_missing_format_defaults() {
        let cell = Cell::plain("x");
        assert_eq!(cell.background(), Rgb::WHITE);
        assert_eq!(cell.foreground(), Rgb::BLACK);
        assert!(!cell.is_bold());
    }
}
