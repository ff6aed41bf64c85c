#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::{json, Value};
use steam_ownership::collector::JsonSource;
use steam_ownership::config::CollectorSettings;
use steam_ownership::{AppId, FetchError};

pub const STORE_API: &str = "http://store.test";
pub const CHARTS_API: &str = "http://charts.test";

/// Canned responses keyed by URL. Unknown URLs answer 404. Error statuses
/// come back as `FetchError::Status`, like `HttpSource`.
#[derive(Default)]
pub struct FakeSource {
    responses: HashMap<String, Result<Value, u16>>,
    pub requests: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn app(mut self, app: FakeApp) -> Self {
        let id = app.app_id;
        self.responses.insert(
            format!("{STORE_API}/api/appdetails?appids={id}&cc=us&l=en"),
            Ok(app.details),
        );
        self.responses
            .insert(format!("{STORE_API}/appreviews/{id}?json=1"), Ok(app.reviews));
        self.responses
            .insert(format!("{CHARTS_API}/app/{id}/chart-data.json"), app.chart);
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

impl JsonSource for FakeSource {
    fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(FetchError::Status(*status)),
            None => Err(FetchError::Status(404)),
        }
    }
}

pub struct FakeApp {
    pub app_id: AppId,
    pub details: Value,
    pub reviews: Value,
    pub chart: Result<Value, u16>,
}

impl FakeApp {
    pub fn paid(id: u32, price: u64, reviews: u64, peak: u64) -> Self {
        Self {
            app_id: AppId(id),
            details: keyed(
                id,
                json!({
                    "success": true,
                    "data": {
                        "is_free": false,
                        "price_overview": { "currency": "USD", "final": price },
                        "release_date": { "coming_soon": false, "date": "Oct 30, 2017" }
                    }
                }),
            ),
            reviews: json!({
                "success": 1,
                "query_summary": { "total_reviews": reviews, "review_score": 7 }
            }),
            chart: Ok(json!([
                [0u64, peak / 2],
                [3_600_000u64, peak],
                [90_000_000u64, peak / 4]
            ])),
        }
    }

    pub fn free(id: u32, reviews: u64, peak: u64) -> Self {
        let mut app = Self::paid(id, 0, reviews, peak);
        app.details = keyed(
            id,
            json!({
                "success": true,
                "data": { "is_free": true, "release_date": { "date": "2019" } }
            }),
        );
        app
    }

    pub fn without_chart(mut self, status: u16) -> Self {
        self.chart = Err(status);
        self
    }
}

// appdetails nests everything under the app id
fn keyed(id: u32, entry: Value) -> Value {
    let mut apps = serde_json::Map::new();
    apps.insert(id.to_string(), entry);
    Value::Object(apps)
}

pub fn settings() -> CollectorSettings {
    CollectorSettings {
        pause_ms: 0,
        store_api: STORE_API.to_string(),
        charts_api: CHARTS_API.to_string(),
        ..CollectorSettings::default()
    }
}
