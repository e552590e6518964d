use thiserror::Error;

/// Failures while talking to the remote spreadsheet service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[cfg(feature = "web")]
    #[error("request to the sheets API failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sheets API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("sheet '{0}' not found")]
    SheetNotFound(String),

    #[error("response contained no grid data for '{0}'")]
    NoGridData(String),
}

/// A caller-supplied dashboard configuration that could not be applied.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config must be a JSON object")]
    NotAnObject,

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Header/row shaping failures that are reported to the caller.
#[derive(Debug, Error, PartialEq)]
pub enum ShapeError {
    #[error("Header row is empty")]
    EmptyHeader,

    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: String },
}

/// Anything that turns a request into a logical failure response.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Shape(#[from] ShapeError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum VisitError {
    #[error("visit counter I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("visit counter file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not replace visit counter file: {0}")]
    Persist(#[from] tempfile::PersistError),
}
