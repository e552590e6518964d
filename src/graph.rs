use serde::Serialize;

use crate::cell::{clean_display, try_parse_number};
use crate::columns::{ColumnRole, HeaderColumn, LABEL_COLUMN};

/// Suffix appended to a column name for its chart label ("chart of X by division").
pub const CHART_LABEL_SUFFIX: &str = "चा आलेख (विभागानुसार)";

/// Available chart types
///
/// Charted columns cycle through these in column order so neighbouring
/// charts on the page look different.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphType {
    Bar,
    Pie,
    Doughnut,
}

impl GraphType {
    const CYCLE: [GraphType; 3] = [GraphType::Bar, GraphType::Pie, GraphType::Doughnut];

    /// Chart type for the header at `position` among a table's headers.
    pub fn for_position(position: usize) -> Self {
        Self::CYCLE[position % Self::CYCLE.len()]
    }
}

/// One labeled data series, ready for the front-end chart library.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chart {
    #[serde(rename = "type")]
    pub graph_type: GraphType,
    pub label: String,
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

/// Creates one chart per chart-role column
///
/// Each row with a non-blank label contributes a point; cells that are not
/// numbers plot as 0. A column whose points are all zero gets no chart.
///
/// # Arguments
/// * `headers` - Header columns of the (already filtered) table
/// * `rows` - Data rows of the table
/// * `chart_headers` - Header names charted regardless of their role
///
/// # Returns
/// * `Vec<Chart>` - Charts in header order
pub fn prepare_charts(
    headers: &[HeaderColumn],
    rows: &[Vec<String>],
    chart_headers: &[&str],
) -> Vec<Chart> {
    let mut charts = Vec::new();
    if headers.is_empty() || rows.is_empty() {
        return charts;
    }

    for (position, header) in headers.iter().enumerate() {
        if !ColumnRole::is_chart(header.role) && !chart_headers.contains(&header.name.as_str()) {
            continue;
        }

        let mut labels = Vec::new();
        let mut data = Vec::new();
        for row in rows {
            let Some(label) = row.get(LABEL_COLUMN).map(|l| clean_display(l)) else {
                continue;
            };
            if label.is_empty() {
                continue;
            }
            labels.push(label);
            data.push(
                row.get(header.col_index)
                    .and_then(|v| try_parse_number(v))
                    .unwrap_or(0.0),
            );
        }

        if !labels.is_empty() && data.iter().any(|v| *v != 0.0) {
            charts.push(Chart {
                graph_type: GraphType::for_position(position),
                label: format!("{} {}", header.name, CHART_LABEL_SUFFIX),
                labels,
                data,
            });
        }
    }

    charts
}
