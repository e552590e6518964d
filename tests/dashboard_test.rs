use sheet_dashboard::aggregator::{
    DashboardConfig, GroupValue, build_dashboard, compute_group_kpis, compute_group_pcts,
    compute_kpis, extract_chart_data,
};
use sheet_dashboard::cell::{Cell, CellFormat, Grid, Rgb};
use sheet_dashboard::columns::{ColumnRole, DEFAULT_CHART_HEADERS, extract_typed_tables};
use sheet_dashboard::graph::GraphType;

// Helper function to turn string literals into owned rows
fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
    data.iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect()
}

fn test_config() -> DashboardConfig {
    DashboardConfig {
        category_col: "Taluka".to_string(),
        kpi_cols: vec!["Projects".to_string()],
        district_cols: vec!["Medium".to_string(), "Small".to_string()],
        pct_col: "Current %".to_string(),
        second_pct_col: "Last Year %".to_string(),
        storage_col: "Storage Total".to_string(),
        groups: vec!["North District".to_string(), "South District".to_string()],
    }
}

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

fn plain_row(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|v| Cell::plain(*v)).collect()
}

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "expected {}, got {}", expected, actual);
}

#[test]
fn test_kpis_skip_blank_and_total_categories() {
    println!("\n====== Testing compute_kpis ======");
    let table = rows(&[
        &["Report"],
        &["Taluka", "Projects", "Storage Total"],
        &["Miraj", "1,200", "40"],
        &["", "99", "1"],
        &["Jat", "n/a", "60"],
        &["TOTAL", "1200", "100"],
    ]);

    let kpis = compute_kpis(&table, &test_config());
    assert_eq!(kpis.total_categories, 2);
    assert_close(kpis.totals["total_projects"], 1200.0);
    println!("✓ Header found below the caption row, bad cells count as zero");

    let json = serde_json::to_value(&kpis).unwrap();
    assert_eq!(json["total_categories"], 2);
    assert_eq!(json["total_projects"], 1200.0);
    println!("✓ KPI totals serialize flat next to total_categories");

    let missing = compute_kpis(&rows(&[&["A", "B"], &["1", "2"]]), &test_config());
    assert_eq!(missing.total_categories, 0);
    assert!(missing.totals.is_empty());
    println!("✓ Missing category column yields empty KPIs");
}

#[test]
fn test_group_kpis_reset_on_total() {
    println!("\n====== Testing compute_group_kpis ======");
    let table = rows(&[
        &["Name", "Projects"],
        &["North District", ""],
        &["Medium", "2"],
        &["Small", "1"],
        &["North District Total", "3"],
        &["South District", ""],
        &["Medium", "4"],
        &["Total", "4"],
        &["Small", "9"],
    ]);

    let groups = compute_group_kpis(&table, &test_config(), GroupValue::CountColumn);
    assert_eq!(groups.len(), 2);
    assert_close(groups["North District"]["Medium"], 2.0);
    assert_close(groups["North District"]["Small"], 1.0);
    assert_close(groups["North District"]["Total"], 3.0);
    println!("✓ North District members summed with a Total");

    assert_close(groups["South District"]["Medium"], 4.0);
    assert_close(groups["South District"]["Small"], 0.0);
    assert_close(groups["South District"]["Total"], 4.0);
    println!("✓ Rows after a total row are not attributed to any group");
}

#[test]
fn test_group_kpis_first_numeric() {
    println!("\n====== Testing first-numeric group values ======");
    let table = rows(&[
        &["Name", "Note", "Count"],
        &["South District", "", ""],
        &["Medium", "x", "7"],
        &["Small", "-3", "5"],
    ]);

    let groups = compute_group_kpis(&table, &test_config(), GroupValue::FirstNumeric);
    assert_close(groups["South District"]["Medium"], 7.0);
    assert_close(groups["South District"]["Small"], 5.0);
    assert_close(groups["South District"]["Total"], 12.0);
    println!("✓ First non-negative number after the label is used");
}

#[test]
fn test_group_percentages() {
    println!("\n====== Testing compute_group_pcts ======");
    let table = rows(&[
        &["Name", "Current %", "Last Year %"],
        &["North District", "", ""],
        &["Medium", "50%", "40"],
        &["Small", "30", "20 %"],
    ]);

    let pcts = compute_group_pcts(&table, &test_config());
    let north = &pcts["North District"];
    assert_close(north["Medium_current_pct"], 50.0);
    assert_close(north["Medium_prev_pct"], 40.0);
    assert_close(north["Small_current_pct"], 30.0);
    assert_close(north["Small_prev_pct"], 20.0);
    assert_close(north["total_current_pct"], 40.0);
    assert_close(north["total_prev_pct"], 30.0);
    println!("✓ Member percentages and their averages computed");

    let no_columns = compute_group_pcts(&rows(&[&["Name"], &["North District"]]), &test_config());
    assert!(no_columns.is_empty());
    println!("✓ Missing percentage columns yield nothing");
}

#[test]
fn test_chart_data_series_and_storage_share() {
    println!("\n====== Testing extract_chart_data ======");
    let table = rows(&[
        &["Taluka", "Projects", "Storage Total", "Current %", "Last Year %"],
        &["Miraj", "3", "40", "50", "45"],
        &["Jat", "2", "60", "30", "20"],
        &["Total", "5", "100", "40", "32.5"],
    ]);

    let chart = extract_chart_data(&table, &test_config());
    assert_eq!(chart.categories, vec!["Miraj", "Jat"]);
    assert_eq!(chart.values["projects"], vec![3.0, 2.0]);
    assert_eq!(chart.values["current_%"], vec![50.0, 30.0]);
    assert_eq!(chart.values["last_year_%"], vec![45.0, 20.0]);
    let shares = &chart.values["storage_total_pct"];
    assert_eq!(shares.len(), 2);
    assert_close(shares[0], 40.0);
    assert_close(shares[1], 60.0);
    println!("✓ One series per column plus storage shares");

    let empty_storage = rows(&[
        &["Taluka", "Projects", "Storage Total"],
        &["Miraj", "3", "0"],
        &["Jat", "2", ""],
    ]);
    let chart = extract_chart_data(&empty_storage, &test_config());
    assert_eq!(chart.values["storage_total_pct"], vec![0.0, 0.0]);
    println!("✓ Zero storage total gives zero shares");
}

#[test]
fn test_build_dashboard_from_formatted_grid() {
    println!("\n====== Testing build_dashboard ======");
    let black = Some(Rgb::new(0.0, 0.0, 0.0));
    let yellow = Some(Rgb::new(1.0, 1.0, 0.0));
    let red = Some(Rgb::new(1.0, 0.0, 0.0));

    let grid = Grid::new(vec![
        vec![styled("19/10/2026", None, red, false)],
        vec![styled("Storage", black, Some(Rgb::WHITE), true)],
        plain_row(&["Taluka", "Projects", "Storage Total"]),
        plain_row(&["North District", "", ""]),
        plain_row(&["Medium", "2", "30"]),
        plain_row(&["Small", "1", "10"]),
        vec![styled("एकूण", yellow, None, true), styled("3", yellow, None, true)],
        vec![styled("Comparison", black, Some(Rgb::WHITE), true)],
        plain_row(&["Name", "Current %", "Last Year %"]),
        plain_row(&["North District", "", ""]),
        plain_row(&["Medium", "60", "50"]),
        vec![styled("Total", yellow, None, false)],
    ]);

    let dashboard = build_dashboard(&grid, &test_config());
    assert_eq!(dashboard.tables.len(), 2);
    assert_eq!(dashboard.tables[0].title, "Storage");
    assert_eq!(dashboard.tables[1].title, "Comparison");
    assert_eq!(dashboard.date, "19/10/2026");
    println!("✓ Two tables and the red report date found");

    assert_eq!(dashboard.kpis.total_categories, 3);
    assert_close(dashboard.kpis_table1_districts["North District"]["Total"], 3.0);
    assert_close(dashboard.storage_pct["North District"]["Medium_current_pct"], 60.0);
    assert_eq!(dashboard.chart_data.values["storage_total_pct"], vec![0.0, 75.0, 25.0]);
    println!("✓ KPIs, group sums and percentages computed per table");
}

#[test]
fn test_typed_tables_from_header_colors() {
    println!("\n====== Testing extract_typed_tables ======");
    let kpi = Some(Rgb::new(0.988, 0.898, 0.804));
    let chart = Some(Rgb::new(0.788, 0.855, 0.973));
    let yellow = Some(Rgb::new(1.0, 1.0, 0.0));

    let grid = Grid::new(vec![
        plain_row(&["Court cases"]),
        plain_row(&[]),
        vec![
            styled("#", None, None, true),
            styled("Division", None, None, true),
            styled("Pending", kpi, None, true),
            styled("Filed", chart, None, true),
            styled("Unused", kpi, None, true),
        ],
        plain_row(&["1", "Pune", "4", "2", "0"]),
        plain_row(&["", "Note", "9", "9", "9"]),
        plain_row(&["2", "Satara", "6", "3", ""]),
        vec![
            styled("", yellow, None, false),
            styled("Total", yellow, None, false),
            styled("10", yellow, None, false),
        ],
        plain_row(&["Appeals"]),
        vec![
            styled("#", None, None, true),
            styled("Division", None, None, true),
            styled("मॅट", None, None, true),
        ],
        plain_row(&["1", "Pune", "5"]),
    ]);

    let tables = extract_typed_tables(&grid, DEFAULT_CHART_HEADERS);
    assert_eq!(tables.len(), 2);

    let first = &tables[0];
    assert_eq!(first.title, "Court cases");
    assert_eq!(first.headers, vec!["Pending", "Filed"]);
    assert_eq!(first.rows.len(), 2);
    assert_eq!(first.rows[1], vec!["2", "Satara", "6", "3"]);
    assert_eq!(first.totals.as_ref().map(|t| t[2].as_str()), Some("10"));
    println!("✓ All-zero column dropped, rows without serial skipped");

    assert_eq!(first.kpis.len(), 1);
    assert_eq!(first.kpis[0].label, "Pending");
    assert_eq!(first.kpis[0].value, 10.0);
    assert_eq!(first.charts.len(), 1);
    assert_eq!(first.charts[0].graph_type, GraphType::Pie);
    assert_eq!(first.charts[0].labels, vec!["Pune", "Satara"]);
    assert_eq!(first.charts[0].data, vec![2.0, 3.0]);
    println!("✓ KPI and chart roles follow header colors");

    let second = &tables[1];
    assert_eq!(second.title, "Appeals");
    assert_eq!(second.header_types[0].role, Some(ColumnRole::Chart));
    assert_eq!(second.charts.len(), 1);
    assert!(second.totals.is_none());
    println!("✓ Allow-listed header is charted without a color");
}
