//! Concurrent-player series from steamcharts.

use serde_json::Value;

use crate::error::FetchError;
use crate::row::AppId;

const DAY_SECONDS: f64 = 24.0 * 3600.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UsageStats {
    pub all_time_peak: Option<f64>,
    pub avg_count: Option<f64>,
    /// Peak over the 24 hours ending at the last sample.
    pub day_peak: Option<f64>,
}

pub fn chart_data_url(base: &str, app_id: AppId) -> String {
    format!("{}/app/{}/chart-data.json", base.trim_end_matches('/'), app_id)
}

/// Decodes `[[timestamp_ms, count], ...]` and summarizes it.
pub fn parse_chart_data(body: Value) -> Result<UsageStats, FetchError> {
    let series: Vec<(f64, f64)> = serde_json::from_value(body)?;
    Ok(summarize(&series))
}

/// Steamcharts answers 400 or 403 for apps it does not track.
pub fn classify_status(err: FetchError) -> FetchError {
    match err {
        FetchError::Status(status @ (400 | 403)) => FetchError::NotFound(status),
        other => other,
    }
}

pub fn summarize(series: &[(f64, f64)]) -> UsageStats {
    let Some(&(last_ms, _)) = series.last() else {
        return UsageStats::default();
    };

    let counts = series.iter().map(|&(_, count)| count);
    let all_time_peak = counts.clone().reduce(f64::max);
    let avg_count = counts.sum::<f64>() / series.len() as f64;

    let threshold = last_ms / 1000.0 - DAY_SECONDS;
    let day_peak = series
        .iter()
        .filter(|&&(timestamp_ms, _)| timestamp_ms / 1000.0 >= threshold)
        .map(|&(_, count)| count)
        .reduce(f64::max);

    UsageStats {
        all_time_peak,
        avg_count: Some(avg_count),
        day_peak,
    }
}
