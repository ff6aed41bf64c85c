//! Store-detail and review-summary extraction.

use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::row::AppId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreInfo {
    pub is_free: Option<bool>,
    /// Final price in cents. Never set for free apps.
    pub price: Option<u64>,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewInfo {
    pub total_reviews: Option<u64>,
    pub review_score: Option<i64>,
}

// `{"<appid>": {"success": true, "data": {...}}}`
#[derive(Deserialize)]
struct AppDetailsEntry {
    data: Option<AppDetailsData>,
}

#[derive(Deserialize)]
struct AppDetailsData {
    #[serde(default)]
    is_free: bool,
    price_overview: Option<PriceOverview>,
    release_date: Option<ReleaseDate>,
}

#[derive(Deserialize)]
struct PriceOverview {
    #[serde(rename = "final")]
    final_price: Option<u64>,
}

#[derive(Deserialize)]
struct ReleaseDate {
    date: Option<String>,
}

#[derive(Deserialize)]
struct AppReviews {
    query_summary: Option<QuerySummary>,
}

#[derive(Deserialize)]
struct QuerySummary {
    total_reviews: Option<u64>,
    review_score: Option<i64>,
}

pub fn app_details_url(base: &str, app_id: AppId, country: &str, language: &str) -> String {
    format!(
        "{}/api/appdetails?appids={}&cc={}&l={}",
        base.trim_end_matches('/'),
        app_id,
        country,
        language
    )
}

pub fn app_reviews_url(base: &str, app_id: AppId) -> String {
    format!("{}/appreviews/{}?json=1", base.trim_end_matches('/'), app_id)
}

pub fn parse_app_details(app_id: AppId, body: Value) -> Result<StoreInfo, FetchError> {
    let Value::Object(mut apps) = body else {
        return Err(FetchError::MissingField("app entry"));
    };
    let entry = apps
        .remove(&app_id.to_string())
        .ok_or(FetchError::MissingField("app entry"))?;
    let entry: AppDetailsEntry = serde_json::from_value(entry)?;
    let data = entry.data.ok_or(FetchError::MissingField("data"))?;

    let price = if data.is_free {
        None
    } else {
        data.price_overview.and_then(|overview| overview.final_price)
    };
    let release_date = data
        .release_date
        .and_then(|release| release.date)
        .filter(|date| !date.trim().is_empty());

    Ok(StoreInfo {
        is_free: Some(data.is_free),
        price,
        release_date,
    })
}

pub fn parse_app_reviews(body: Value) -> Result<ReviewInfo, FetchError> {
    let reviews: AppReviews = serde_json::from_value(body)?;
    let summary = reviews
        .query_summary
        .ok_or(FetchError::MissingField("query_summary"))?;
    Ok(ReviewInfo {
        total_reviews: summary.total_reviews,
        review_score: summary.review_score,
    })
}
