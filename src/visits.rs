//! Per-page, per-day visit counts kept in a flat JSON file.
//!
//! Layout: `{ "<path>": { "<YYYY-MM-DD>": { "count": n, "ip_ports": [..] } } }`.
//! Older files stored a bare integer per day; those entries are upgraded on
//! the next write.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use url::Url;

use crate::error::VisitError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct DayVisits {
    count: u64,
    ip_ports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredDay {
    Current(DayVisits),
    Legacy(u64),
}

impl StoredDay {
    /// A legacy count keeps its number and starts with no known clients.
    fn into_current(self) -> DayVisits {
        match self {
            StoredDay::Current(day) => day,
            StoredDay::Legacy(count) => DayVisits {
                count,
                ip_ports: Vec::new(),
            },
        }
    }
}

type VisitLog = BTreeMap<String, BTreeMap<String, StoredDay>>;

/// What the page shows after recording a visit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitSummary {
    pub date: String,
    pub total_visits_today: u64,
    pub unique_ips: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The visited path of a page URL; `"/"` when no URL is given.
pub fn page_path(page_url: Option<&str>) -> String {
    let Some(raw) = page_url.map(str::trim).filter(|u| !u.is_empty()) else {
        return "/".to_string();
    };
    match Url::parse(raw) {
        Ok(url) => url.path().to_string(),
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .filter(|p| !p.is_empty())
            .unwrap_or("/")
            .to_string(),
    }
}

/// Visit counter backed by a single JSON file.
///
/// Each read-modify-write holds an in-process lock and replaces the file
/// atomically, so concurrent requests in one process never lose a count.
/// Separate processes sharing the file are still not coordinated.
pub struct VisitCounter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl VisitCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        VisitCounter {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Counts one visit by `client` to the page at `page_url` on `today`.
    ///
    /// Never fails: an I/O or parse problem is logged and reported in the
    /// summary's `error` field with zero counts.
    pub fn record(&self, page_url: Option<&str>, client: &str, today: NaiveDate) -> VisitSummary {
        let path = page_path(page_url);
        let date = today.format("%Y-%m-%d").to_string();
        log::info!("record_visit started: path={} client={}", path, client);

        match self.try_record(&path, &date, client) {
            Ok((total_visits_today, unique_ips)) => VisitSummary {
                date,
                total_visits_today,
                unique_ips,
                error: None,
            },
            Err(e) => {
                log::error!("record_visit failed for {}: {}", path, e);
                VisitSummary {
                    date,
                    total_visits_today: 0,
                    unique_ips: 0,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    fn try_record(&self, path: &str, date: &str, client: &str) -> Result<(u64, usize), VisitError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut visits = self.load()?;
        let days = visits.entry(path.to_string()).or_default();
        let mut day = days
            .remove(date)
            .map(StoredDay::into_current)
            .unwrap_or_default();

        day.count += 1;
        if !day.ip_ports.iter().any(|ip| ip == client) {
            day.ip_ports.push(client.to_string());
        }
        let counts = (day.count, day.ip_ports.len());
        days.insert(date.to_string(), StoredDay::Current(day));

        self.store(&visits)?;
        Ok(counts)
    }

    fn load(&self) -> Result<VisitLog, VisitError> {
        if !self.path.exists() {
            return Ok(VisitLog::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(VisitLog::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn store(&self, visits: &VisitLog) -> Result<(), VisitError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, visits)?;
        file.write_all(b"\n")?;
        file.persist(&self.path)?;
        Ok(())
    }
}
