#![allow(dead_code)]
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Share of the series assigned to the training slice
pub const TRAIN_FRACTION: f64 = 0.8;

/// One observation: a trading day and its closing price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self { date, price }
    }
}

/// Ordered univariate price series. Construction validates ordering, so a
/// `TimeSeries` value always has strictly increasing dates and finite
/// prices. The pipeline treats it as read-only input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<PricePoint>,
}

impl TimeSeries {
    /// Build a series from already-parsed points, rejecting anything the
    /// pipeline cannot work with.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        if points.is_empty() {
            return Err(ForecastError::DataValidation(
                "series is empty".to_string(),
            ));
        }

        for window in points.windows(2) {
            if window[1].date <= window[0].date {
                return Err(ForecastError::DataValidation(format!(
                    "timestamps not strictly increasing at {} -> {}",
                    window[0].date, window[1].date
                )));
            }
        }

        if let Some(bad) = points.iter().find(|p| !p.price.is_finite()) {
            return Err(ForecastError::DataValidation(format!(
                "non-finite price at {}",
                bad.date
            )));
        }

        Ok(Self { points })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.points[self.points.len() - 1].date
    }

    /// Partition chronologically at `⌊TRAIN_FRACTION · n⌋`. Train always
    /// precedes test in time; there is no shuffling anywhere in the
    /// pipeline.
    pub fn split_chronological(&self) -> Split<'_> {
        let boundary = (self.points.len() as f64 * TRAIN_FRACTION) as usize;
        let (train, test) = self.points.split_at(boundary);
        Split { train, test }
    }
}

/// Chronological train/test partition borrowed from a `TimeSeries`
#[derive(Debug, Clone, Copy)]
pub struct Split<'a> {
    pub train: &'a [PricePoint],
    pub test: &'a [PricePoint],
}

impl Split<'_> {
    pub fn train_values(&self) -> Vec<f64> {
        self.train.iter().map(|p| p.price).collect()
    }

    pub fn test_values(&self) -> Vec<f64> {
        self.test.iter().map(|p| p.price).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(u64::from(day - 1))
    }

    fn linear_series(n: u32, start: f64) -> TimeSeries {
        let points = (0..n)
            .map(|i| PricePoint::new(date(i + 1), start + i as f64))
            .collect();
        TimeSeries::from_points(points).unwrap()
    }

    #[test]
    fn test_empty_series_rejected() {
        let err = TimeSeries::from_points(vec![]).unwrap_err();
        assert!(matches!(err, ForecastError::DataValidation(_)));
    }

    #[test]
    fn test_unsorted_series_rejected() {
        let points = vec![
            PricePoint::new(date(2), 10.0),
            PricePoint::new(date(1), 11.0),
        ];
        let err = TimeSeries::from_points(points).unwrap_err();
        assert!(matches!(err, ForecastError::DataValidation(_)));
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let points = vec![
            PricePoint::new(date(1), 10.0),
            PricePoint::new(date(1), 11.0),
        ];
        assert!(TimeSeries::from_points(points).is_err());
    }

    #[test]
    fn test_non_finite_price_rejected() {
        let points = vec![
            PricePoint::new(date(1), 10.0),
            PricePoint::new(date(2), f64::NAN),
        ];
        assert!(TimeSeries::from_points(points).is_err());
    }

    #[test]
    fn test_split_eleven_points() {
        // 11 points -> floor(0.8 * 11) = 8 train, 3 test
        let series = linear_series(11, 10.0);
        let split = series.split_chronological();
        assert_eq!(split.train.len(), 8);
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train_values(), vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0]);
        assert_eq!(split.test_values(), vec![18.0, 19.0, 20.0]);
    }

    #[test]
    fn test_split_is_chronological() {
        let series = linear_series(50, 100.0);
        let split = series.split_chronological();
        let last_train = split.train.last().unwrap().date;
        for p in split.test {
            assert!(last_train < p.date);
        }
    }
}
