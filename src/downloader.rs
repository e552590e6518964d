//! Fetching sheet contents.
//!
//! [`SheetSource`] is the seam between the HTTP handlers and wherever the
//! cells come from: [`GoogleSheets`] talks to the Sheets v4 REST API, and
//! [`MemorySource`] serves fixed grids for tests and offline use.

use std::collections::HashMap;
use std::future::Future;

use crate::cell::{Cell, Grid};
use crate::error::FetchError;
use crate::loader::Bounds;

/// Convert column number to letter (A=1, B=2, etc.)
///
/// # Arguments
/// * `col` - Column number (1-based)
///
/// # Returns
/// * `String` - Column letter (A, B, ..., Z, AA, AB, ...)
pub fn column_to_letter(col: usize) -> String {
    let mut name = String::new();
    let mut n = col;

    while n > 0 {
        n -= 1;
        name.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
    }

    name
}

/// A sheet plus an optional bottom-right corner, always anchored at A1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub bounds: Option<Bounds>,
}

impl A1Range {
    pub fn whole(sheet: impl Into<String>) -> Self {
        A1Range {
            sheet: sheet.into(),
            bounds: None,
        }
    }

    pub fn bounded(sheet: impl Into<String>, bounds: Bounds) -> Self {
        A1Range {
            sheet: sheet.into(),
            bounds: Some(bounds),
        }
    }

    /// A1 notation, e.g. `'Tender'!A1:Z50`. The sheet name is always quoted.
    pub fn to_a1(&self) -> String {
        let sheet = format!("'{}'", self.sheet.replace('\'', "''"));
        match self.bounds {
            Some(b) => format!("{}!A1:{}{}", sheet, column_to_letter(b.max_cols), b.max_rows),
            None => sheet,
        }
    }

    /// Cuts rows and cells that fall outside the range.
    pub fn clip<T: Clone>(&self, rows: &[Vec<T>]) -> Vec<Vec<T>> {
        match self.bounds {
            Some(b) => rows
                .iter()
                .take(b.max_rows)
                .map(|row| row.iter().take(b.max_cols).cloned().collect())
                .collect(),
            None => rows.to_vec(),
        }
    }
}

/// Where sheet contents come from.
pub trait SheetSource: Send + Sync + 'static {
    /// Formatted display strings of the range, row-major.
    fn fetch_values(
        &self,
        range: &A1Range,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, FetchError>> + Send;

    /// Values plus formatting of the range.
    fn fetch_grid(&self, range: &A1Range) -> impl Future<Output = Result<Grid, FetchError>> + Send;
}

/// Grids held in memory, keyed by sheet name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sheets: HashMap<String, Grid>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, name: impl Into<String>, grid: Grid) -> Self {
        self.sheets.insert(name.into(), grid);
        self
    }

    fn clipped(&self, range: &A1Range) -> Result<Grid, FetchError> {
        let grid = self
            .sheets
            .get(&range.sheet)
            .ok_or_else(|| FetchError::SheetNotFound(range.sheet.clone()))?;
        Ok(Grid::new(range.clip::<Cell>(&grid.rows)))
    }
}

impl SheetSource for MemorySource {
    fn fetch_values(
        &self,
        range: &A1Range,
    ) -> impl Future<Output = Result<Vec<Vec<String>>, FetchError>> + Send {
        std::future::ready(self.clipped(range).map(|grid| grid.values()))
    }

    fn fetch_grid(&self, range: &A1Range) -> impl Future<Output = Result<Grid, FetchError>> + Send {
        std::future::ready(self.clipped(range))
    }
}

#[cfg(feature = "web")]
pub use google::GoogleSheets;

#[cfg(feature = "web")]
mod google {
    use std::future::Future;

    use serde::Deserialize;
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    use super::{A1Range, SheetSource};
    use crate::cell::{Cell, CellFormat, Grid, Rgb};
    use crate::config::SheetsAuth;
    use crate::error::FetchError;

    pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com";

    /// Only the fields the extractors read.
    const GRID_FIELDS: &str = "sheets(data(rowData(values(formattedValue,\
        userEnteredFormat(backgroundColor,textFormat(bold,foregroundColor)),\
        effectiveFormat(backgroundColor,textFormat(bold,foregroundColor))))))";

    #[derive(Deserialize)]
    struct ValueRange {
        #[serde(default)]
        values: Vec<Vec<Value>>,
    }

    #[derive(Deserialize)]
    struct SpreadsheetDoc {
        #[serde(default)]
        sheets: Vec<SheetDoc>,
    }

    #[derive(Deserialize)]
    struct SheetDoc {
        #[serde(default)]
        data: Vec<GridData>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct GridData {
        #[serde(default)]
        row_data: Vec<RowData>,
    }

    #[derive(Deserialize)]
    struct RowData {
        #[serde(default)]
        values: Vec<CellData>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct CellData {
        formatted_value: Option<String>,
        user_entered_format: Option<ApiFormat>,
        effective_format: Option<ApiFormat>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ApiFormat {
        background_color: Option<Rgb>,
        text_format: Option<TextFormat>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct TextFormat {
        bold: Option<bool>,
        foreground_color: Option<Rgb>,
    }

    impl CellData {
        /// User-entered formatting wins field by field; effective formatting
        /// fills whatever it leaves out.
        fn into_cell(self) -> Cell {
            let value = self.formatted_value.unwrap_or_default();
            let (user, effective) = (self.user_entered_format, self.effective_format);
            if user.is_none() && effective.is_none() {
                return Cell::plain(value);
            }

            fn text(f: &Option<ApiFormat>) -> Option<&TextFormat> {
                f.as_ref().and_then(|f| f.text_format.as_ref())
            }
            let background = user
                .as_ref()
                .and_then(|f| f.background_color)
                .or_else(|| effective.as_ref().and_then(|f| f.background_color));
            let foreground = text(&user)
                .and_then(|t| t.foreground_color)
                .or_else(|| text(&effective).and_then(|t| t.foreground_color));
            let bold = text(&user)
                .and_then(|t| t.bold)
                .or_else(|| text(&effective).and_then(|t| t.bold))
                .unwrap_or(false);

            Cell::styled(
                value,
                CellFormat {
                    background,
                    foreground,
                    bold,
                },
            )
        }
    }

    fn display(value: Value) -> String {
        match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Client for one spreadsheet, built once at startup and shared by all requests.
    pub struct GoogleSheets {
        http: reqwest::Client,
        spreadsheet_id: String,
        auth: SheetsAuth,
        base_url: String,
    }

    impl GoogleSheets {
        pub fn new(
            spreadsheet_id: impl Into<String>,
            auth: SheetsAuth,
        ) -> Result<Self, FetchError> {
            let http = reqwest::Client::builder()
                .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
                .timeout(std::time::Duration::from_secs(30))
                .build()?;
            Ok(GoogleSheets {
                http,
                spreadsheet_id: spreadsheet_id.into(),
                auth,
                base_url: DEFAULT_BASE_URL.to_string(),
            })
        }

        /// Points the client at another host, e.g. a local mock of the API.
        pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
            self.base_url = base_url.into().trim_end_matches('/').to_string();
            self
        }

        fn spreadsheet_url(&self) -> String {
            format!("{}/v4/spreadsheets/{}", self.base_url, self.spreadsheet_id)
        }

        fn get(&self, url: &str) -> reqwest::RequestBuilder {
            let request = self.http.get(url);
            match &self.auth {
                SheetsAuth::ApiKey(key) => request.query(&[("key", key)]),
                SheetsAuth::BearerToken(token) => request.bearer_auth(token),
            }
        }

        async fn send<T: DeserializeOwned>(
            request: reqwest::RequestBuilder,
        ) -> Result<T, FetchError> {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(FetchError::Api {
                    status: status.as_u16(),
                    message,
                });
            }
            Ok(response.json::<T>().await?)
        }

        async fn values(&self, range: &A1Range) -> Result<Vec<Vec<String>>, FetchError> {
            let a1 = range.to_a1();
            let url = format!("{}/values/{}", self.spreadsheet_url(), urlencoding::encode(&a1));
            log::debug!("Fetching values {}", a1);

            let request = self.get(&url).query(&[
                ("valueRenderOption", "FORMATTED_VALUE"),
                ("dateTimeRenderOption", "FORMATTED_STRING"),
            ]);
            let body: ValueRange = Self::send(request).await?;

            Ok(body
                .values
                .into_iter()
                .map(|row| row.into_iter().map(display).collect())
                .collect())
        }

        async fn grid(&self, range: &A1Range) -> Result<Grid, FetchError> {
            let a1 = range.to_a1();
            log::debug!("Fetching grid {}", a1);

            let request = self.get(&self.spreadsheet_url()).query(&[
                ("ranges", a1.as_str()),
                ("includeGridData", "true"),
                ("fields", GRID_FIELDS),
            ]);
            let doc: SpreadsheetDoc = Self::send(request).await?;

            let data = doc
                .sheets
                .into_iter()
                .next()
                .and_then(|sheet| sheet.data.into_iter().next())
                .ok_or_else(|| FetchError::NoGridData(range.sheet.clone()))?;

            Ok(Grid::new(
                data.row_data
                    .into_iter()
                    .map(|row| row.values.into_iter().map(CellData::into_cell).collect())
                    .collect(),
            ))
        }
    }

    impl SheetSource for GoogleSheets {
        fn fetch_values(
            &self,
            range: &A1Range,
        ) -> impl Future<Output = Result<Vec<Vec<String>>, FetchError>> + Send {
            self.values(range)
        }

        fn fetch_grid(
            &self,
            range: &A1Range,
        ) -> impl Future<Output = Result<Grid, FetchError>> + Send {
            self.grid(range)
        }
    }

}
