use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::ForecastError;
use crate::types::{PricePoint, TimeSeries};

/// Date formats accepted in the input CSV, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%b %d, %Y"];

/// Outcome of an ingestion pass. Dropped rows are surfaced as a count,
/// never silently absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    /// Rows that made it into the series
    pub loaded: usize,
    /// Rows dropped for an unparseable date/price or a duplicate date
    pub dropped: usize,
}

/// CSV loader for a date + price table
#[derive(Debug, Clone)]
pub struct CsvLoader {
    date_column: String,
    price_column: String,
}

impl Default for CsvLoader {
    fn default() -> Self {
        Self {
            date_column: "Date".to_string(),
            price_column: "Price".to_string(),
        }
    }
}

impl CsvLoader {
    pub fn new(date_column: impl Into<String>, price_column: impl Into<String>) -> Self {
        Self {
            date_column: date_column.into(),
            price_column: price_column.into(),
        }
    }

    /// Load a series from a CSV file on disk
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<(TimeSeries, LoadReport), ForecastError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::DataValidation(format!("cannot open {}: {}", path.display(), e))
        })?;
        let result = self.load_reader(file)?;
        info!(
            "Loaded {} rows from {} ({} dropped)",
            result.1.loaded,
            path.display(),
            result.1.dropped
        );
        Ok(result)
    }

    /// Load a series from any reader producing CSV with a header row.
    /// Rows whose date or price cannot be parsed are dropped and counted.
    /// Rows are sorted by date; on duplicate dates the first row wins.
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<(TimeSeries, LoadReport), ForecastError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| ForecastError::DataValidation(format!("cannot read CSV header: {}", e)))?
            .clone();

        let date_idx = headers
            .iter()
            .position(|h| h.trim() == self.date_column)
            .ok_or_else(|| {
                ForecastError::DataValidation(format!("missing column '{}'", self.date_column))
            })?;
        let price_idx = headers
            .iter()
            .position(|h| h.trim() == self.price_column)
            .ok_or_else(|| {
                ForecastError::DataValidation(format!("missing column '{}'", self.price_column))
            })?;

        let mut rows: Vec<PricePoint> = Vec::new();
        let mut dropped = 0usize;

        for record in csv_reader.records() {
            let record = match record {
                Ok(r) => r,
                Err(_) => {
                    dropped += 1;
                    continue;
                }
            };

            let date = record.get(date_idx).and_then(|s| parse_date(s.trim()));
            let price = record
                .get(price_idx)
                .and_then(|s| s.trim().replace(',', "").parse::<f64>().ok())
                .filter(|p| p.is_finite());

            match (date, price) {
                (Some(date), Some(price)) => rows.push(PricePoint::new(date, price)),
                _ => dropped += 1,
            }
        }

        rows.sort_by_key(|p| p.date);

        // First occurrence wins on duplicate dates
        let before = rows.len();
        rows.dedup_by_key(|p| p.date);
        dropped += before - rows.len();

        if dropped > 0 {
            warn!("Dropped {} unusable rows during ingestion", dropped);
        }

        let loaded = rows.len();
        let series = TimeSeries::from_points(rows)?;
        Ok((series, LoadReport { loaded, dropped }))
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}
