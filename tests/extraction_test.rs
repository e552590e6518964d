use sheet_dashboard::cell::{Cell, CellFormat, Grid, Rgb};
use sheet_dashboard::error::ShapeError;
use sheet_dashboard::loader::{
    Bounds, HeaderSelection, HighlightedSheet, SheetData, shape_highlighted, shape_titled,
    shape_values,
};
use sheet_dashboard::splitter::extract_tables;

// Helper function to build a formatted cell
fn styled(value: &str, background: Option<Rgb>, foreground: Option<Rgb>, bold: bool) -> Cell {
    Cell::styled(
        value,
        CellFormat {
            background,
            foreground,
            bold,
        },
    )
}

// Helper function for a white-on-black title row
fn title_row(text: &str) -> Vec<Cell> {
    vec![styled(text, Some(Rgb::new(0.05, 0.05, 0.05)), Some(Rgb::WHITE), true)]
}

// Helper function for a yellow total row
fn total_row(values: &[&str]) -> Vec<Cell> {
    values
        .iter()
        .map(|v| styled(v, Some(Rgb::new(1.0, 1.0, 0.0)), None, true))
        .collect()
}

fn plain_row(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::plain(*v)).collect()
}

fn sample_values() -> Vec<Vec<String>> {
    vec![
        vec!["Title"],
        vec![],
        vec!["H1", "H2"],
        vec!["a", "1"],
        vec!["b", "2"],
        vec!["Total", "3"],
    ]
    .into_iter()
    .map(|row| row.into_iter().map(String::from).collect())
    .collect()
}

#[test]
fn test_plain_grid_with_banner_title() {
    println!("\n====== Testing plain grid extraction ======");
    let values = sample_values();

    let data = shape_values(&values, HeaderSelection::Auto, Bounds::default());
    assert_eq!(data.headers, vec!["H1", "H2"]);
    assert_eq!(data.rows, vec![vec!["a", "1"], vec!["b", "2"]]);
    assert_eq!(data.total_rows, 2);
    assert_eq!(data.total_columns, 2);
    assert_eq!(data.totals, Some(vec!["Total".to_string(), "3".to_string()]));
    assert_eq!(data.title_rows, vec![vec!["Title", ""]]);
    println!("✓ Auto header picks H1/H2 and splits the total row off");

    let tables = extract_tables(&Grid::from_values(values), 2);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].title, "Title");
    assert_eq!(tables[0].headers, vec!["H1", "H2"]);
    assert_eq!(tables[0].rows.len(), 2);
    assert_eq!(tables[0].total, Some(vec!["Total".to_string(), "3".to_string()]));
    println!("✓ Splitter finds one table with a total row");
}

#[test]
fn test_fixed_header_index() {
    println!("\n====== Testing fixed header index ======");
    let values = sample_values();

    let data = shape_values(&values, HeaderSelection::Index(3), Bounds::default());
    assert_eq!(data.headers, vec!["a", "1"]);
    assert_eq!(data.total_rows, 1);
    println!("✓ Header taken from row 3 as requested");

    let data = shape_values(&values, HeaderSelection::Index(40), Bounds::default());
    assert!(data.headers.is_empty());
    assert_eq!(data.total_rows, 0);
    println!("✓ Out-of-range header index yields empty data");

    let bounded = shape_values(&values, HeaderSelection::Auto, Bounds { max_rows: 4, max_cols: 2 });
    assert_eq!(bounded.headers, vec!["H1", "H2"]);
    assert_eq!(bounded.rows, vec![vec!["a", "1"]]);
    assert_eq!(bounded.totals, None);
    println!("✓ Row and column bounds are applied before shaping");
}

#[test]
fn test_empty_grid_everywhere() {
    println!("\n====== Testing empty grids ======");
    let data = shape_values(&[], HeaderSelection::Auto, Bounds::default());
    assert!(data.headers.is_empty() && data.rows.is_empty());
    assert_eq!((data.total_rows, data.total_columns), (0, 0));

    assert!(extract_tables(&Grid::default(), 2).is_empty());
    assert_eq!(shape_titled(&[], 3, 3, 26).unwrap().total_rows, 0);
    assert_eq!(shape_highlighted(&Grid::default()), HighlightedSheet::default());
    println!("✓ Zero-row grids produce empty results");
}

#[test]
fn test_styled_grid_two_tables_limit() {
    println!("\n====== Testing formatted multi-table grid ======");
    let grid = Grid::new(vec![
        title_row("Storage by taluka"),
        plain_row(&[]),
        plain_row(&["Taluka", "Projects"]),
        plain_row(&["Miraj", "3"]),
        plain_row(&["", ""]),
        plain_row(&["Jat", "2"]),
        total_row(&["एकूण", "5"]),
        title_row("Second"),
        plain_row(&["Name", "Value", "Extra"]),
        plain_row(&["x", "1"]),
        total_row(&["Total", "1", "", ""]),
        title_row("Third"),
        plain_row(&["Ignored"]),
    ]);

    let tables = extract_tables(&grid, 2);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].title, "Storage by taluka");
    assert_eq!(tables[0].rows, vec![vec!["Miraj", "3"], vec!["Jat", "2"]]);
    assert_eq!(tables[0].total, Some(vec!["एकूण".to_string(), "5".to_string()]));
    println!("✓ First table skips blank rows and closes on the yellow total");

    assert_eq!(tables[1].headers, vec!["Name", "Value", "Extra"]);
    assert_eq!(tables[1].rows, vec![vec!["x", "1", ""]]);
    assert_eq!(tables[1].total.as_ref().map(Vec::len), Some(3));
    println!("✓ Rows are padded and trimmed to the header width");

    assert_eq!(extract_tables(&grid, 5).len(), 3);
    println!("✓ Table limit stops the scan");
}

#[test]
fn test_fallback_split() {
    println!("\n====== Testing fallback split ======");
    let grid = Grid::new(vec![
        vec![styled("Name", None, None, true), Cell::plain("Qty")],
        plain_row(&["a", "1"]),
        plain_row(&[]),
        plain_row(&["b", "2"]),
        plain_row(&["c", "3"]),
    ]);

    let tables = extract_tables(&grid, 2);
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].title, "Table 1 (Fallback)");
    assert_eq!(tables[0].headers, vec!["Name", "Qty"]);
    assert_eq!(tables[0].rows, vec![vec!["a", "1"]]);
    assert_eq!(tables[1].title, "Table 2 (Fallback)");
    assert_eq!(tables[1].headers, vec!["b", "2"]);
    assert_eq!(tables[1].rows, vec![vec!["c", "3"]]);
    println!("✓ Grid without titles is split in half");
}

#[test]
fn test_titled_layout() {
    println!("\n====== Testing titled layout ======");
    let values: Vec<Vec<String>> = vec![
        vec!["Tender status"],
        vec!["As of 19/10/2026"],
        vec!["Sr", "Work", "Amount", ""],
        vec!["1", "Canal lining", "40"],
        vec![""],
        vec!["2", "Gate repair"],
    ]
    .into_iter()
    .map(|row| row.into_iter().map(String::from).collect())
    .collect();

    let data = shape_titled(&values, 2, 2, 26).unwrap();
    assert_eq!(data.headers, vec!["Sr", "Work", "Amount"]);
    assert_eq!(data.title_rows.len(), 2);
    assert_eq!(data.title_rows[0], vec!["Tender status", "", ""]);
    assert_eq!(data.rows, vec![vec!["1", "Canal lining", "40"], vec!["2", "Gate repair", ""]]);
    assert_eq!(data.total_rows, 2);
    println!("✓ Title rows kept, rows padded to the named headers");

    assert_eq!(shape_titled(&values, 2, 4, 26), Err(ShapeError::EmptyHeader));
    println!("✓ Blank header row is reported");

    assert_eq!(shape_titled(&values, 2, 50, 26), Ok(SheetData::default()));
    println!("✓ Header index past the last row yields empty data");
}

#[test]
fn test_highlighted_header() {
    println!("\n====== Testing highlighted header ======");
    let orange = Some(Rgb::new(1.0, 0.6, 0.0));
    let grid = Grid::new(vec![
        plain_row(&["Water use"]),
        vec![
            styled("Dam", orange, None, true),
            styled("Level", orange, None, true),
            Cell::plain(""),
        ],
        plain_row(&["Koyna", "82"]),
        plain_row(&["Ujani", "40", "note"]),
    ]);

    let sheet = shape_highlighted(&grid);
    assert_eq!(sheet.title_rows, vec![vec!["Water use", "", ""]]);
    assert_eq!(sheet.headers, vec!["Dam", "Level", ""]);
    assert_eq!(sheet.rows.len(), 2);
    assert!(sheet.rows.iter().all(|r| r.len() == 3));
    println!("✓ Orange row is the header, rows above are titles");

    let plain = Grid::new(vec![plain_row(&["A", "B"]), plain_row(&["1", "2"])]);
    let sheet = shape_highlighted(&plain);
    assert!(sheet.title_rows.is_empty());
    assert_eq!(sheet.headers, vec!["A", "B"]);
    println!("✓ Row 0 is the header when nothing is highlighted");
}
