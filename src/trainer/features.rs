use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::error::TrainError;
use crate::row::StoreRow;

pub const FEATURE_COUNT: usize = 8;

/// Model input columns, in the order the booster sees them.
pub const FEATURE_COLUMNS: [&str; FEATURE_COUNT] = [
    "total_reviews",
    "review_score",
    "is_free",
    "price",
    "all_time_peak",
    "avg_count",
    "day_peak",
    "release_date_numeric",
];

pub const TARGET_COLUMN: &str = "ownership";

/// Stand-in for any missing numeric value, unparseable dates included.
pub const MISSING: f64 = -1.0;

pub type FeatureVector = [f64; FEATURE_COUNT];

// Comma-less day formats would read "Oct 2017" as 20 Oct 0017.
const FULL_DATE_FORMATS: [&str; 6] = [
    "%b %d, %Y",
    "%d %b, %Y",
    "%B %d, %Y",
    "%d %B, %Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
];

const MONTH_FORMATS: [&str; 2] = ["%d %b %Y", "%d %B %Y"];

/// Seconds since the Unix epoch for the date strings Steam shows on store
/// pages. Month-only and year-only dates resolve to their first day.
pub fn parse_release_date(text: &str) -> Option<i64> {
    let text = text.trim();
    let date = FULL_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            let first_of_month = format!("1 {}", text.replace(',', ""));
            MONTH_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(&first_of_month, format).ok())
        })
        .or_else(|| {
            if text.len() == 4 && text.bytes().all(|b| b.is_ascii_digit()) {
                NaiveDate::from_ymd_opt(text.parse().ok()?, 1, 1)
            } else {
                None
            }
        })?;

    Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
}

/// Encodes one row. Returns `None` for paid apps with no price, which the
/// model never sees.
pub fn feature_vector(row: &StoreRow) -> Option<FeatureVector> {
    if row.is_free == Some(false) && row.price.is_none() {
        return None;
    }

    let or_missing = |value: Option<f64>| value.unwrap_or(MISSING);
    let is_free = match row.is_free {
        Some(true) => 1.0,
        Some(false) => 0.0,
        None => MISSING,
    };
    let release = row
        .release_date
        .as_deref()
        .and_then(parse_release_date)
        .map(|seconds| seconds as f64);

    Some([
        or_missing(row.total_reviews.map(|v| v as f64)),
        or_missing(row.review_score.map(|v| v as f64)),
        is_free,
        or_missing(row.price.map(|v| v as f64)),
        or_missing(row.all_time_peak),
        or_missing(row.avg_count),
        or_missing(row.day_peak),
        or_missing(release),
    ])
}

fn parse_label(row: &StoreRow, label: &str) -> Result<f64, TrainError> {
    label
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| TrainError::InvalidLabel {
            app_id: row.app_id,
            value: label.to_string(),
        })
}

/// Builds the feature columns plus the numeric target for every labeled,
/// non-excluded row.
pub fn feature_frame(rows: &[StoreRow]) -> Result<DataFrame, TrainError> {
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(rows.len()); FEATURE_COUNT];
    let mut target = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(label) = row.label() else {
            continue;
        };
        let Some(features) = feature_vector(row) else {
            debug!(app_id = %row.app_id, "paid app without a price; skipped");
            continue;
        };
        target.push(parse_label(row, label)?);
        for (column, value) in columns.iter_mut().zip(features) {
            column.push(value);
        }
    }

    let mut series: Vec<Series> = FEATURE_COLUMNS
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name, values))
        .collect();
    series.push(Series::new(TARGET_COLUMN, target));

    Ok(DataFrame::new(series)?)
}

pub fn split_features_and_target(df: &DataFrame) -> PolarsResult<(DataFrame, DataFrame)> {
    let features = df.select(FEATURE_COLUMNS)?;
    let target = df.select([TARGET_COLUMN])?;

    Ok((features, target))
}

/// `(X, y)` for the given rows.
pub fn derive_features(rows: &[StoreRow]) -> Result<(DataFrame, DataFrame), TrainError> {
    let df = feature_frame(rows)?;
    Ok(split_features_and_target(&df)?)
}
