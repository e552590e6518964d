use axum::{
    Json, Router,
    extract::{ConnectInfo, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::aggregator::{DashboardConfig, build_dashboard};
use crate::columns::{DEFAULT_CHART_HEADERS, extract_typed_tables};
use crate::config::{
    DEFAULT_DASHBOARD_SHEET, DEFAULT_HIGHLIGHTED_SHEET, DEFAULT_SHEET, DEFAULT_TITLE_ROWS,
    DEFAULT_TITLED_HEADER_ROW, DEFAULT_TITLED_MAX_ROWS, DEFAULT_TITLED_SHEET, DEFAULT_TYPED_SHEET,
    MAX_COLS_LIMIT, MAX_ROWS_LIMIT, ServerConfig, resolve_sheet_request,
};
use crate::downloader::{A1Range, GoogleSheets, SheetSource};
use crate::error::{RequestError, ShapeError};
use crate::loader::{
    Bounds, DEFAULT_MAX_COLS, HeaderSelection, shape_highlighted, shape_titled, shape_values,
};
use crate::visits::{VisitCounter, VisitSummary};

const NO_CACHE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const UNKNOWN_CLIENT: &str = "unknown";

pub struct AppState<S> {
    pub source: S,
    pub visits: VisitCounter,
    pub static_dir: PathBuf,
}

impl<S: SheetSource> AppState<S> {
    pub fn new(source: S, visits: VisitCounter, static_dir: impl Into<PathBuf>) -> Self {
        AppState {
            source,
            visits,
            static_dir: static_dir.into(),
        }
    }
}

#[derive(Deserialize, Default)]
struct SheetQuery {
    sheet_name: Option<String>,
    header_row_idx: Option<String>,
    max_rows: Option<String>,
    max_cols: Option<String>,
}

#[derive(Deserialize, Default)]
struct TitledQuery {
    sheet_name: Option<String>,
    title_rows: Option<String>,
    header_row_idx: Option<String>,
}

#[derive(Deserialize, Default)]
struct DashboardQuery {
    sheet_name: Option<String>,
    config: Option<String>,
}

#[derive(Deserialize, Default)]
struct VisitQuery {
    page_url: Option<String>,
}

#[derive(Serialize)]
struct Success<T> {
    success: bool,
    #[serde(flatten)]
    body: T,
}

#[derive(Serialize)]
struct DataSuccess<T> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
struct Failure {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct StatusMessage<T> {
    status: &'static str,
    message: T,
}

fn failure(route: &str, err: impl Display) -> Response {
    log::error!("{} failed: {}", route, err);
    Json(Failure {
        success: false,
        error: err.to_string(),
    })
    .into_response()
}

fn status_fail(route: &str, err: impl Display) -> Response {
    log::error!("{} failed: {}", route, err);
    Json(StatusMessage {
        status: "fail",
        message: err.to_string(),
    })
    .into_response()
}

fn parse_count(name: &'static str, raw: Option<&str>) -> Result<Option<usize>, ShapeError> {
    match raw.map(str::trim).filter(|v| !v.is_empty() && *v != "null") {
        None => Ok(None),
        Some(v) => v.parse::<usize>().map(Some).map_err(|_| ShapeError::InvalidParameter {
            name,
            value: v.to_string(),
        }),
    }
}

fn sheet_or(name: Option<String>, default: &str) -> String {
    name.map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Builds the router; tests drive it directly with a `MemorySource`.
pub fn router<S: SheetSource>(state: Arc<AppState<S>>) -> Router {
    let static_dir = state.static_dir.clone();
    Router::new()
        .route("/api/sheet", get(get_sheet::<S>))
        .route("/api/sheet/titled", get(get_titled_sheet::<S>))
        .route("/api/sheet/highlighted", get(get_highlighted_sheet::<S>))
        .route("/api/dashboard", get(get_dashboard::<S>))
        .route("/api/tables", get(get_typed_tables::<S>))
        .route("/api/visit", get(record_visit::<S>).post(record_visit::<S>))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static(NO_CACHE),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let source = GoogleSheets::new(&config.spreadsheet_id, config.auth.clone())?;
    let app_state = Arc::new(AppState::new(
        source,
        VisitCounter::new(&config.visit_counts_file),
        &config.static_dir,
    ));
    let app = router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    println!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

async fn get_sheet<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    query: Option<Query<SheetQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let sheet = sheet_or(query.sheet_name, DEFAULT_SHEET);

    let result = async {
        let header = HeaderSelection::parse(query.header_row_idx.as_deref())?;
        let max_rows = parse_count("max_rows", query.max_rows.as_deref())?;
        let max_cols = parse_count("max_cols", query.max_cols.as_deref())?;
        let (header, bounds) = resolve_sheet_request(&sheet, header, max_rows, max_cols);

        let values = state.source.fetch_values(&A1Range::bounded(&sheet, bounds)).await?;
        Ok::<_, RequestError>(shape_values(&values, header, bounds))
    }
    .await;

    match result {
        Ok(data) => {
            log::info!(
                "GET /api/sheet {}: {} rows x {} columns",
                sheet,
                data.total_rows,
                data.total_columns
            );
            Json(Success {
                success: true,
                body: data,
            })
            .into_response()
        }
        Err(e) => failure("GET /api/sheet", e),
    }
}

async fn get_titled_sheet<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    query: Option<Query<TitledQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let sheet = sheet_or(query.sheet_name, DEFAULT_TITLED_SHEET);

    let result = async {
        let title_rows =
            parse_count("title_rows", query.title_rows.as_deref())?.unwrap_or(DEFAULT_TITLE_ROWS);
        let header_row = parse_count("header_row_idx", query.header_row_idx.as_deref())?
            .unwrap_or(DEFAULT_TITLED_HEADER_ROW);
        let bounds = Bounds {
            max_rows: DEFAULT_TITLED_MAX_ROWS.max(header_row + 1).min(MAX_ROWS_LIMIT),
            max_cols: DEFAULT_MAX_COLS,
        };

        let values = state.source.fetch_values(&A1Range::bounded(&sheet, bounds)).await?;
        Ok::<_, RequestError>(shape_titled(&values, title_rows, header_row, bounds.max_cols)?)
    }
    .await;

    match result {
        Ok(data) => {
            log::info!("GET /api/sheet/titled {}: {} rows", sheet, data.total_rows);
            Json(Success {
                success: true,
                body: data,
            })
            .into_response()
        }
        Err(e) => failure("GET /api/sheet/titled", e),
    }
}

async fn get_highlighted_sheet<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    query: Option<Query<SheetQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let sheet = sheet_or(query.sheet_name, DEFAULT_HIGHLIGHTED_SHEET);
    let bounds = Bounds {
        max_rows: DEFAULT_TITLED_MAX_ROWS,
        max_cols: MAX_COLS_LIMIT,
    };

    let result = async {
        let grid = state.source.fetch_grid(&A1Range::bounded(&sheet, bounds)).await?;
        Ok::<_, RequestError>(shape_highlighted(&grid))
    }
    .await;

    match result {
        Ok(data) => {
            log::info!("GET /api/sheet/highlighted {}: {} rows", sheet, data.rows.len());
            Json(DataSuccess {
                success: true,
                data,
            })
            .into_response()
        }
        Err(e) => failure("GET /api/sheet/highlighted", e),
    }
}

async fn get_dashboard<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    query: Option<Query<DashboardQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let sheet = sheet_or(query.sheet_name, DEFAULT_DASHBOARD_SHEET);

    let result = async {
        let config = DashboardConfig::from_request(query.config.as_deref())?;
        let grid = state.source.fetch_grid(&A1Range::whole(&sheet)).await?;
        Ok::<_, RequestError>(build_dashboard(&grid, &config))
    }
    .await;

    match result {
        Ok(dashboard) => {
            log::info!("GET /api/dashboard {}: {} tables", sheet, dashboard.tables.len());
            Json(StatusMessage {
                status: "ok",
                message: dashboard,
            })
            .into_response()
        }
        Err(e) => status_fail("GET /api/dashboard", e),
    }
}

async fn get_typed_tables<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    query: Option<Query<DashboardQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let sheet = sheet_or(query.sheet_name, DEFAULT_TYPED_SHEET);

    match state.source.fetch_grid(&A1Range::whole(&sheet)).await {
        Ok(grid) => {
            let tables = extract_typed_tables(&grid, DEFAULT_CHART_HEADERS);
            log::info!("GET /api/tables {}: {} tables", sheet, tables.len());
            Json(StatusMessage {
                status: "ok",
                message: tables,
            })
            .into_response()
        }
        Err(e) => status_fail("GET /api/tables", e),
    }
}

/// First `X-Forwarded-For` entry, else the peer address.
fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .or_else(|| peer.map(|p| p.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

async fn record_visit<S: SheetSource>(
    State(state): State<Arc<AppState<S>>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    query: Option<Query<VisitQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    let client = client_id(&headers, peer.map(|ConnectInfo(addr)| addr));
    let today = chrono::Local::now().date_naive();

    let counter = Arc::clone(&state);
    let summary = tokio::task::spawn_blocking(move || {
        counter.visits.record(query.page_url.as_deref(), &client, today)
    })
    .await
    .unwrap_or_else(|e| {
        log::error!("record_visit task failed: {}", e);
        VisitSummary {
            date: today.format("%Y-%m-%d").to_string(),
            total_visits_today: 0,
            unique_ips: 0,
            error: Some(e.to_string()),
        }
    });

    Json(summary).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_prefers_forwarded_for() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        assert_eq!(client_id(&headers, None), "unknown");
        assert_eq!(client_id(&headers, Some(peer)), "10.0.0.9");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_id(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("max_rows", None), Ok(None));
        assert_eq!(parse_count("max_rows", Some("null")), Ok(None));
        assert_eq!(parse_count("max_rows", Some(" 40 ")), Ok(Some(40)));
        assert!(parse_count("max_rows", Some("-1")).is_err());
    }
}
