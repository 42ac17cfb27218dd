pub mod series;

pub use series::{PricePoint, Split, TimeSeries, TRAIN_FRACTION};
