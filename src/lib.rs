/*!
# Sheet Dashboard

A small JSON backend that reads a live spreadsheet and turns it into tables,
KPIs and chart series for a browser dashboard.

## Overview

Report sheets are laid out for people, not programs: several tables share a
sheet, titles sit in colored banner rows, totals hide in yellow rows, and a
header cell's tint says whether its column is a KPI or a chart series. The
crate reads the values and formatting of a sheet and recovers that structure.

## Architecture

### Extraction Layer
- **cell**: Cell, color and grid types plus the text/number cleaning helpers
- **classifier**: Row predicates driven by color swatches and total markers
- **splitter**: Walks a grid and cuts it into titled tables with totals
- **loader**: Shapes single-table sheets (auto header, fixed title rows, highlighted header)

### Aggregation Layer
- **aggregator**: Header-driven dashboard KPIs, group sums and chart data
- **columns**: Tables whose header colors assign column roles
- **graph**: Chart series for the charted columns

### Support Layer
- **downloader**: `SheetSource` trait and an in-memory source; the Sheets REST client
  needs feature `web`
- **visits**: Per-page, per-day visit counter persisted to a JSON file
- **config**: Environment settings and per-sheet request presets
- **error**: Error enums shared by all layers

### Service Layer (feature `web`)
- **app**: axum routes; every response is HTTP 200 JSON

## REST API Endpoints

- `GET /api/sheet` - Single table with automatic or fixed header row
- `GET /api/sheet/titled` - Table below a fixed number of title rows
- `GET /api/sheet/highlighted` - Table whose header row is highlighted
- `GET /api/dashboard` - Dashboard tables, KPIs and chart data
- `GET /api/tables` - Color-typed tables with KPIs and charts
- `POST /api/visit` - Record a page visit
*/

pub mod aggregator;
pub mod cell;
pub mod classifier;
pub mod columns;
pub mod config;
pub mod downloader;
pub mod error;
pub mod graph;
pub mod loader;
pub mod splitter;
pub mod visits;

#[cfg(feature = "web")]
pub mod app;

/// Re-export the extraction types to make them easier to use
pub use aggregator::*;
pub use cell::*;
pub use columns::*;
pub use error::*;
pub use graph::*;
pub use loader::*;
pub use splitter::*;
pub use visits::*;
