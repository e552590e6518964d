//! Server settings and the per-sheet request presets.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::loader::{Bounds, DEFAULT_MAX_COLS, DEFAULT_MAX_ROWS, HeaderSelection};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_VISIT_COUNTS_FILE: &str = "database/visitor_counts.json";
pub const DEFAULT_STATIC_DIR: &str = "static";

pub const DEFAULT_SHEET: &str = "Tender";
pub const DEFAULT_TITLED_SHEET: &str = "Tender3";
pub const DEFAULT_HIGHLIGHTED_SHEET: &str = "Pani Vapar 2";
pub const DEFAULT_DASHBOARD_SHEET: &str = "Sheet2";
pub const DEFAULT_TYPED_SHEET: &str = "sheet3";

pub const DEFAULT_TITLE_ROWS: usize = 3;
pub const DEFAULT_TITLED_HEADER_ROW: usize = 3;
pub const DEFAULT_TITLED_MAX_ROWS: usize = 1000;

/// Upper limits on caller-supplied bounds (row 10000, column ZZ).
pub const MAX_ROWS_LIMIT: usize = 10_000;
pub const MAX_COLS_LIMIT: usize = 702;

/// Fixed layout of a known sheet, used when the caller leaves the header row open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetPreset {
    pub name: &'static str,
    pub header: HeaderSelection,
    pub max_rows: usize,
}

pub const SHEET_PRESETS: &[SheetPreset] = &[
    SheetPreset {
        name: "Tender",
        header: HeaderSelection::Index(0),
        max_rows: 50,
    },
    SheetPreset {
        name: "Tender2",
        header: HeaderSelection::Index(2),
        max_rows: 50,
    },
    SheetPreset {
        name: "Sheet_pdf",
        header: HeaderSelection::Auto,
        max_rows: 100,
    },
];

pub fn preset_for(sheet: &str) -> Option<&'static SheetPreset> {
    SHEET_PRESETS.iter().find(|p| p.name == sheet)
}

/// Works out the header row and bounds of a plain-sheet request.
///
/// A preset applies only when no header row was requested, and then it also
/// fixes the row bound. Otherwise the caller's bounds are used, defaulting to
/// 100 rows and 26 columns; either way they are capped at the hard limits.
pub fn resolve_sheet_request(
    sheet: &str,
    header: Option<HeaderSelection>,
    max_rows: Option<usize>,
    max_cols: Option<usize>,
) -> (HeaderSelection, Bounds) {
    let max_cols = max_cols.unwrap_or(DEFAULT_MAX_COLS).clamp(1, MAX_COLS_LIMIT);

    let (header, max_rows) = match (header, preset_for(sheet)) {
        (Some(header), _) => (header, max_rows.unwrap_or(DEFAULT_MAX_ROWS)),
        (None, Some(preset)) => (preset.header, preset.max_rows),
        (None, None) => (HeaderSelection::Auto, max_rows.unwrap_or(DEFAULT_MAX_ROWS)),
    };

    let bounds = Bounds {
        max_rows: max_rows.clamp(1, MAX_ROWS_LIMIT),
        max_cols,
    };
    (header, bounds)
}

/// Credentials for the spreadsheet service.
#[derive(Clone, PartialEq, Eq)]
pub enum SheetsAuth {
    ApiKey(String),
    BearerToken(String),
}

impl std::fmt::Debug for SheetsAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetsAuth::ApiKey(_) => f.write_str("ApiKey(..)"),
            SheetsAuth::BearerToken(_) => f.write_str("BearerToken(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub spreadsheet_id: String,
    pub auth: SheetsAuth,
    pub visit_counts_file: PathBuf,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    /// Reads settings through `lookup`; blank values count as unset.
    ///
    /// `SHEETS_SPREADSHEET_ID` is required, as is one of `SHEETS_ACCESS_TOKEN`
    /// (preferred) or `SHEETS_API_KEY`.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let spreadsheet_id =
            var("SHEETS_SPREADSHEET_ID").ok_or(ConfigError::Missing("SHEETS_SPREADSHEET_ID"))?;
        let auth = match (var("SHEETS_ACCESS_TOKEN"), var("SHEETS_API_KEY")) {
            (Some(token), _) => SheetsAuth::BearerToken(token),
            (None, Some(key)) => SheetsAuth::ApiKey(key),
            (None, None) => {
                return Err(ConfigError::Missing("SHEETS_API_KEY or SHEETS_ACCESS_TOKEN"));
            }
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        if bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid {
                name: "BIND_ADDR",
                value: bind_addr,
            });
        }

        Ok(ServerConfig {
            bind_addr,
            spreadsheet_id,
            auth,
            visit_counts_file: var("VISIT_COUNTS_FILE")
                .unwrap_or_else(|| DEFAULT_VISIT_COUNTS_FILE.to_string())
                .into(),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()).into(),
        })
    }

    /// Process environment, after loading a `.env` file if one exists.
    #[cfg(feature = "web")]
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => log::info!("Loaded settings from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Ignoring unreadable .env file: {}", e),
        }
        Self::from_vars(|name| std::env::var(name).ok())
    }
}
