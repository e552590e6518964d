//! Header-driven KPI, group and chart computations for the dashboard.
//!
//! Columns are located by case-insensitive substring match of configured
//! name fragments against cleaned header text; the first matching column
//! wins. Every numeric cell goes through [`parse_number`], so a bad cell
//! counts as zero and never aborts the computation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::{Grid, clean_display, clean_header, parse_number, try_parse_number};
use crate::classifier::{TOTAL_MARKER, TOTAL_MARKERS, find_highlighted_date, is_total_text};
use crate::error::ConfigError;
use crate::splitter::{Table, extract_tables};

pub const DASHBOARD_TABLE_LIMIT: usize = 2;
/// Count column used when no KPI column is configured.
pub const DEFAULT_COUNT_COL: &str = "प्रकल्प संख्या";
/// Header terms tried when the configured current-percentage column is missing.
pub const CURRENT_PCT_FALLBACK: &[&str] = &["उपयुक्त", "टक्केवारी"];
/// Header terms tried when the configured previous-percentage column is missing.
pub const PREVIOUS_PCT_FALLBACK: &[&str] = &["मागील", "टक्केवारी"];
pub const GROUP_TOTAL_KEY: &str = "Total";

/// Keys a caller may override through the `config` request parameter.
pub const CONFIG_KEYS: &[&str] = &[
    "categoryCol",
    "kpiCols",
    "districtCols",
    "pctCol",
    "secondPctCol",
    "storageCol",
    "groups",
];

/// Column-name fragments and group names the dashboard looks for.
///
/// An empty string for `pct_col`, `second_pct_col` or `storage_col` turns
/// that computation off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardConfig {
    pub category_col: String,
    pub kpi_cols: Vec<String>,
    /// Member columns reported per group.
    pub district_cols: Vec<String>,
    pub pct_col: String,
    pub second_pct_col: String,
    pub storage_col: String,
    pub groups: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            category_col: "तालुक्याचे नांव".to_string(),
            kpi_cols: vec!["प्रकल्प संख्या".to_string()],
            district_cols: vec!["मध्यम प्रकल्प".to_string(), "लघु प्रकल्प".to_string()],
            pct_col: "उपयुक्त साठा (द.ल.घ.फू.) टक्केवारी %".to_string(),
            second_pct_col: "गतवर्षीच्या याच दिनांकाची टक्केवारी %".to_string(),
            storage_col: "आजचा साठा एकूण".to_string(),
            groups: vec![
                "सांगली जिल्हा".to_string(),
                "सातारा जिल्हा".to_string(),
                "सोलापूर जिल्हा".to_string(),
            ],
        }
    }
}

impl DashboardConfig {
    /// Overlays a JSON object from the request on the defaults.
    ///
    /// Keys outside [`CONFIG_KEYS`] are dropped. A missing, blank or `null`
    /// parameter yields the defaults.
    pub fn from_request(raw: Option<&str>) -> Result<Self, ConfigError> {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Ok(Self::default());
        };
        let overrides = match serde_json::from_str::<Value>(raw)? {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            _ => return Err(ConfigError::NotAnObject),
        };

        let mut merged = serde_json::to_value(Self::default())?;
        if let Value::Object(base) = &mut merged {
            for (key, value) in overrides {
                if CONFIG_KEYS.contains(&key.as_str()) {
                    base.insert(key, value);
                } else {
                    log::debug!("Dropping unknown config key {:?}", key);
                }
            }
        }
        Ok(serde_json::from_value(merged)?)
    }
}

/// Scalar totals for the first table.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct KpiSummary {
    pub total_categories: usize,
    #[serde(flatten)]
    pub totals: BTreeMap<String, f64>,
}

/// Group name, then column key, then value.
pub type GroupTable = BTreeMap<String, BTreeMap<String, f64>>;

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ChartData {
    pub categories: Vec<String>,
    pub values: BTreeMap<String, Vec<f64>>,
}

/// Where a group member row's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupValue {
    /// The configured count column (first KPI column).
    CountColumn,
    /// The first non-negative number after the label column.
    FirstNumeric,
}

/// `"Medium Projects"` becomes `"medium_projects"`.
pub fn column_key(col: &str) -> String {
    col.replace(' ', "_").to_lowercase()
}

pub fn find_column(header: &[String], fragment: &str) -> Option<usize> {
    let needle = clean_header(fragment);
    if needle.is_empty() {
        return None;
    }
    header.iter().position(|h| clean_header(h).contains(&needle))
}

fn find_column_with_all(header: &[String], terms: &[&str]) -> Option<usize> {
    header.iter().position(|h| {
        let h = clean_header(h);
        terms.iter().all(|t| h.contains(&t.to_lowercase()))
    })
}

/// First row containing the category column name in any cell.
pub fn find_header_row(rows: &[Vec<String>], category: &str) -> Option<usize> {
    let needle = clean_header(category);
    if needle.is_empty() {
        return None;
    }
    rows.iter()
        .position(|row| row.iter().any(|cell| clean_header(cell).contains(&needle)))
}

fn row_text(row: &[String]) -> String {
    row.iter()
        .map(|c| clean_display(c))
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_total_category(category: &str) -> bool {
    let lowered = category.to_lowercase();
    TOTAL_MARKERS.iter().any(|marker| lowered == *marker)
}

fn cell_number(row: &[String], idx: Option<usize>) -> f64 {
    idx.and_then(|i| row.get(i)).map_or(0.0, |v| parse_number(v))
}

enum GroupStep {
    Enter(String),
    Reset,
    Stay,
}

/// Group attribution for one row: a group-name row starts (or re-enters) a
/// group, a total row ends the current one. A row naming an already seen
/// group together with a total marker is that group's total and ends it.
fn group_step(
    groups: &[String],
    in_group: bool,
    text: &str,
    seen: impl Fn(&str) -> bool,
) -> GroupStep {
    let total = is_total_text(text);
    let hit = groups.iter().find(|g| {
        let g = clean_display(g);
        !g.is_empty() && text.contains(&g)
    });
    match hit {
        Some(group) if total && seen(group) => GroupStep::Reset,
        Some(group) => GroupStep::Enter(group.clone()),
        None if total && in_group => GroupStep::Reset,
        None => GroupStep::Stay,
    }
}

fn member_column<'a>(members: &'a [String], text: &str) -> Option<&'a String> {
    members.iter().find(|col| {
        let col = clean_display(col);
        !col.is_empty() && text.contains(&col)
    })
}

/// Counts categories and sums each KPI column over the data rows of a table.
///
/// The header is the first row mentioning the category column; rows with a
/// blank category or a category equal to a total marker are skipped.
pub fn compute_kpis(rows: &[Vec<String>], config: &DashboardConfig) -> KpiSummary {
    if rows.len() < 2 {
        return KpiSummary::default();
    }
    let Some(header_idx) = find_header_row(rows, &config.category_col) else {
        log::info!("KPIs: category column not found in any row");
        return KpiSummary::default();
    };
    let header = &rows[header_idx];
    let Some(category_idx) = find_column(header, &config.category_col) else {
        log::info!("KPIs: category index not found in header");
        return KpiSummary::default();
    };

    let kpi_columns: Vec<(String, Option<usize>)> = config
        .kpi_cols
        .iter()
        .map(|col| (format!("total_{}", column_key(col)), find_column(header, col)))
        .collect();

    let mut summary = KpiSummary::default();
    for (key, _) in &kpi_columns {
        summary.totals.insert(key.clone(), 0.0);
    }

    for row in &rows[header_idx + 1..] {
        let Some(category) = row.get(category_idx).map(|c| clean_display(c)) else {
            continue;
        };
        if category.is_empty() || is_total_category(&category) {
            continue;
        }
        summary.total_categories += 1;
        for (key, idx) in &kpi_columns {
            if let Some(total) = summary.totals.get_mut(key) {
                *total += cell_number(row, *idx);
            }
        }
    }

    log::debug!("KPIs computed: {:?}", summary);
    summary
}

/// Per-group values of the member columns, plus a `"Total"` per group.
///
/// Rows are attributed to the last group-name row seen; a total row ends the
/// group and later rows stay unattributed until the next group-name row.
pub fn compute_group_kpis(
    rows: &[Vec<String>],
    config: &DashboardConfig,
    source: GroupValue,
) -> GroupTable {
    let mut kpis = GroupTable::new();
    if rows.len() < 2 {
        return kpis;
    }
    let header = &rows[0];

    let count_idx = match source {
        GroupValue::CountColumn => {
            let name = config.kpi_cols.first().map_or(DEFAULT_COUNT_COL, String::as_str);
            match find_column(header, name) {
                Some(idx) => Some(idx),
                None => {
                    log::info!("Group KPIs: count column {:?} not found in header", name);
                    return kpis;
                }
            }
        }
        GroupValue::FirstNumeric => None,
    };

    let mut current: Option<String> = None;
    for row in &rows[1..] {
        let text = row_text(row);
        let step = group_step(&config.groups, current.is_some(), &text, |g| kpis.contains_key(g));
        match step {
            GroupStep::Enter(group) => {
                kpis.entry(group.clone()).or_insert_with(|| {
                    config.district_cols.iter().map(|col| (col.clone(), 0.0)).collect()
                });
                current = Some(group);
            }
            GroupStep::Reset => {
                current = None;
                continue;
            }
            GroupStep::Stay => {}
        }

        let Some(group) = &current else {
            continue;
        };
        let Some(col) = member_column(&config.district_cols, &text) else {
            continue;
        };
        let value = match source {
            GroupValue::CountColumn => cell_number(row, count_idx),
            GroupValue::FirstNumeric => row
                .iter()
                .skip(1)
                .filter_map(|c| try_parse_number(c))
                .find(|v| *v >= 0.0)
                .unwrap_or(0.0),
        };
        if let Some(slot) = kpis.get_mut(group).and_then(|g| g.get_mut(col)) {
            *slot += value;
        }
    }

    for values in kpis.values_mut() {
        let total: f64 = values.values().sum();
        values.insert(GROUP_TOTAL_KEY.to_string(), total);
    }
    log::debug!("Group KPIs computed: {:?}", kpis);
    kpis
}

/// Current and previous-year percentages per group member, with their
/// averages as `total_current_pct` and `total_prev_pct`.
pub fn compute_group_pcts(rows: &[Vec<String>], config: &DashboardConfig) -> GroupTable {
    let mut pcts = GroupTable::new();
    if rows.len() < 2 {
        return pcts;
    }
    let header = &rows[0];
    let current_idx = find_column(header, &config.pct_col)
        .or_else(|| find_column_with_all(header, CURRENT_PCT_FALLBACK));
    let prev_idx = find_column(header, &config.second_pct_col)
        .or_else(|| find_column_with_all(header, PREVIOUS_PCT_FALLBACK));
    let (Some(current_idx), Some(prev_idx)) = (current_idx, prev_idx) else {
        log::info!("Group pcts: percentage columns not found in header");
        return pcts;
    };

    let mut current: Option<String> = None;
    for row in &rows[1..] {
        let text = row_text(row);
        let step = group_step(&config.groups, current.is_some(), &text, |g| pcts.contains_key(g));
        match step {
            GroupStep::Enter(group) => {
                pcts.entry(group.clone()).or_default();
                current = Some(group);
            }
            GroupStep::Reset => {
                current = None;
                continue;
            }
            GroupStep::Stay => {}
        }

        let (Some(group), Some(col)) = (&current, member_column(&config.district_cols, &text))
        else {
            continue;
        };
        let key = col.replace(' ', "_");
        if let Some(values) = pcts.get_mut(group) {
            values.insert(format!("{}_current_pct", key), cell_number(row, Some(current_idx)));
            values.insert(format!("{}_prev_pct", key), cell_number(row, Some(prev_idx)));
        }
    }

    for values in pcts.values_mut() {
        for (suffix, total_key) in [
            ("_current_pct", "total_current_pct"),
            ("_prev_pct", "total_prev_pct"),
        ] {
            let found: Vec<f64> = config
                .district_cols
                .iter()
                .filter_map(|col| {
                    values
                        .get(&format!("{}{}", col.replace(' ', "_"), suffix))
                        .copied()
                })
                .collect();
            let average = if found.is_empty() {
                0.0
            } else {
                found.iter().sum::<f64>() / found.len() as f64
            };
            values.insert(total_key.to_string(), average);
        }
    }
    pcts
}

/// Category labels and one value series per KPI and percentage column, plus
/// each category's share of the storage column as `<storage>_pct`.
pub fn extract_chart_data(rows: &[Vec<String>], config: &DashboardConfig) -> ChartData {
    let mut chart = ChartData::default();
    if rows.len() < 2 {
        return chart;
    }
    let Some(header_idx) = find_header_row(rows, &config.category_col) else {
        log::info!("Chart data: category column not found");
        return chart;
    };
    let header = &rows[header_idx];
    let Some(category_idx) = find_column(header, &config.category_col) else {
        return chart;
    };

    let mut series: Vec<(String, Option<usize>)> = Vec::new();
    for col in &config.kpi_cols {
        series.push((column_key(col), find_column(header, col)));
    }
    if !config.pct_col.is_empty() {
        let idx = find_column(header, &config.pct_col)
            .or_else(|| find_column_with_all(header, CURRENT_PCT_FALLBACK));
        series.push((column_key(&config.pct_col), idx));
    }
    if !config.second_pct_col.is_empty() {
        let idx = find_column(header, &config.second_pct_col)
            .or_else(|| find_column_with_all(header, PREVIOUS_PCT_FALLBACK));
        series.push((column_key(&config.second_pct_col), idx));
    }
    let mut seen = std::collections::BTreeSet::new();
    series.retain(|(key, _)| seen.insert(key.clone()));
    for (key, _) in &series {
        chart.values.insert(key.clone(), Vec::new());
    }

    let storage_search = clean_header(&config.storage_col)
        .replace(TOTAL_MARKER, "")
        .trim()
        .to_string();
    let storage_idx = if storage_search.is_empty() {
        None
    } else {
        header.iter().position(|h| clean_header(h).contains(&storage_search))
    };
    let mut storage_values = Vec::new();

    for row in &rows[header_idx + 1..] {
        let Some(category) = row.get(category_idx).map(|c| clean_display(c)) else {
            continue;
        };
        if category.is_empty() || is_total_category(&category) {
            continue;
        }
        chart.categories.push(category);
        for (key, idx) in &series {
            if let Some(values) = chart.values.get_mut(key) {
                values.push(cell_number(row, *idx));
            }
        }
        storage_values.push(cell_number(row, storage_idx));
    }

    if !config.storage_col.is_empty() && !storage_values.is_empty() {
        let total: f64 = storage_values.iter().sum();
        let shares = storage_values
            .iter()
            .map(|v| if total > 0.0 { v / total * 100.0 } else { 0.0 })
            .collect();
        chart
            .values
            .insert(format!("{}_pct", column_key(&config.storage_col)), shares);
    }
    log::debug!("Chart data extracted: {} categories", chart.categories.len());
    chart
}

/// Everything the dashboard page renders, computed from one grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub tables: Vec<Table>,
    pub kpis: KpiSummary,
    pub kpis_table1_districts: GroupTable,
    pub kpis_table2: GroupTable,
    pub date: String,
    pub chart_data: ChartData,
    pub chart_data2: ChartData,
    pub storage_pct: GroupTable,
}

pub fn build_dashboard(grid: &Grid, config: &DashboardConfig) -> Dashboard {
    let tables = extract_tables(grid, DASHBOARD_TABLE_LIMIT);
    log::info!("Extracted {} tables from {} rows", tables.len(), grid.len());
    let first = tables.first().map(Table::raw_rows).unwrap_or_default();
    let second = tables.get(1).map(Table::raw_rows).unwrap_or_default();

    Dashboard {
        kpis: compute_kpis(&first, config),
        kpis_table1_districts: compute_group_kpis(&first, config, GroupValue::CountColumn),
        kpis_table2: compute_group_kpis(&second, config, GroupValue::FirstNumeric),
        date: find_highlighted_date(grid),
        chart_data: extract_chart_data(&first, config),
        chart_data2: extract_chart_data(&second, config),
        storage_pct: compute_group_pcts(&second, config),
        tables,
    }
}
