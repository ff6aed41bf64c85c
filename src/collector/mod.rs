//! Fetches per-app statistics and merges them into the tabular store.

pub mod charts;
pub mod source;
pub mod steam;

use std::path::Path;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::CollectorSettings;
use crate::error::{FetchError, StoreError};
use crate::row::{AppId, StoreRow};
use crate::store::TabularStore;

pub use charts::UsageStats;
pub use source::{HttpSource, JsonSource};
pub use steam::{ReviewInfo, StoreInfo};

/// Outcome of one endpoint call.
#[derive(Debug)]
pub enum Fetch<T> {
    Fetched(T),
    Unavailable(FetchError),
}

impl<T> Fetch<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Fetch::Fetched(value) => Some(value),
            Fetch::Unavailable(_) => None,
        }
    }

    pub fn as_ref(&self) -> Option<&T> {
        match self {
            Fetch::Fetched(value) => Some(value),
            Fetch::Unavailable(_) => None,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Fetch::Unavailable(_))
    }
}

impl<T> From<Result<T, FetchError>> for Fetch<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => Fetch::Fetched(value),
            Err(err) => Fetch::Unavailable(err),
        }
    }
}

/// The three fetches for one app.
#[derive(Debug)]
pub struct CollectedApp {
    pub app_id: AppId,
    pub store: Fetch<StoreInfo>,
    pub reviews: Fetch<ReviewInfo>,
    pub usage: Fetch<UsageStats>,
}

impl CollectedApp {
    pub fn unavailable(&self) -> usize {
        [
            self.store.is_unavailable(),
            self.reviews.is_unavailable(),
            self.usage.is_unavailable(),
        ]
        .into_iter()
        .filter(|missing| *missing)
        .count()
    }

    /// Flattens the fetches into a row with no label.
    pub fn into_row(self) -> StoreRow {
        let store = self.store.ok().unwrap_or_default();
        let reviews = self.reviews.ok().unwrap_or_default();
        let usage = self.usage.ok().unwrap_or_default();

        StoreRow {
            app_id: self.app_id,
            total_reviews: reviews.total_reviews,
            review_score: reviews.review_score,
            is_free: store.is_free,
            price: store.price,
            release_date: store.release_date,
            all_time_peak: usage.all_time_peak,
            avg_count: usage.avg_count,
            day_peak: usage.day_peak,
            ownership: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectReport {
    pub collected: usize,
    pub unavailable_fetches: usize,
    pub rows_written: usize,
}

pub struct Collector<S = HttpSource> {
    source: S,
    settings: CollectorSettings,
}

impl Collector<HttpSource> {
    pub fn from_settings(settings: CollectorSettings) -> Result<Self> {
        let source = HttpSource::new().context("building http client")?;
        Ok(Self::new(source, settings))
    }
}

impl<S: JsonSource> Collector<S> {
    pub fn new(source: S, settings: CollectorSettings) -> Self {
        Self { source, settings }
    }

    pub fn fetch_store_info(&self, app_id: AppId) -> Fetch<StoreInfo> {
        let url = steam::app_details_url(
            &self.settings.store_api,
            app_id,
            &self.settings.country,
            &self.settings.language,
        );
        let fetch: Fetch<StoreInfo> = self
            .source
            .get_json(&url)
            .and_then(|body| steam::parse_app_details(app_id, body))
            .into();
        log_unavailable(app_id, "store detail", &fetch);
        fetch
    }

    pub fn fetch_review_info(&self, app_id: AppId) -> Fetch<ReviewInfo> {
        let url = steam::app_reviews_url(&self.settings.store_api, app_id);
        let fetch: Fetch<ReviewInfo> = self
            .source
            .get_json(&url)
            .and_then(steam::parse_app_reviews)
            .into();
        log_unavailable(app_id, "review summary", &fetch);
        fetch
    }

    pub fn fetch_usage_series(&self, app_id: AppId) -> Fetch<UsageStats> {
        let url = charts::chart_data_url(&self.settings.charts_api, app_id);
        let fetch: Fetch<UsageStats> = self
            .source
            .get_json(&url)
            .map_err(charts::classify_status)
            .and_then(charts::parse_chart_data)
            .into();
        log_unavailable(app_id, "usage chart", &fetch);
        fetch
    }

    /// Runs the three fetches for one app, one after another.
    pub fn collect_app(&self, app_id: AppId) -> CollectedApp {
        CollectedApp {
            app_id,
            reviews: self.fetch_review_info(app_id),
            store: self.fetch_store_info(app_id),
            usage: self.fetch_usage_series(app_id),
        }
    }

    /// Collects every app in `app_ids` and rewrites the store at `store_path`.
    ///
    /// The existing file is read before any request goes out, so a malformed
    /// store aborts the run without touching the network.
    pub fn run(&self, app_ids: &[AppId], store_path: &Path) -> Result<CollectReport> {
        let mut store = TabularStore::load_or_default(store_path)
            .with_context(|| format!("reading tabular store {}", store_path.display()))?;
        info!(
            apps = app_ids.len(),
            existing_rows = store.len(),
            "collecting app statistics"
        );

        let pause = Duration::from_millis(self.settings.pause_ms);
        let mut report = CollectReport::default();
        let mut fresh = Vec::with_capacity(app_ids.len());
        for &app_id in app_ids {
            let collected = self.collect_app(app_id);
            report.unavailable_fetches += collected.unavailable();
            report.collected += 1;
            debug!(%app_id, unavailable = collected.unavailable(), "collected app");
            fresh.push(collected.into_row());

            // pacing for upstream rate limits
            if !pause.is_zero() {
                thread::sleep(pause);
            }
        }

        merge_and_write(&mut store, fresh, store_path)
            .with_context(|| format!("writing tabular store {}", store_path.display()))?;
        report.rows_written = store.len();

        info!(
            collected = report.collected,
            unavailable_fetches = report.unavailable_fetches,
            rows = report.rows_written,
            "tabular store updated"
        );
        Ok(report)
    }
}

/// Replaces each fresh row in `store`, carrying over a non-empty prior label,
/// then rewrites `path` in full. Rows for other apps are left as they were.
pub fn merge_and_write(
    store: &mut TabularStore,
    fresh: impl IntoIterator<Item = StoreRow>,
    path: &Path,
) -> Result<(), StoreError> {
    for mut row in fresh {
        row.ownership = store
            .get(row.app_id)
            .and_then(StoreRow::label)
            .map(str::to_string);
        store.upsert(row);
    }
    store.save(path)
}

fn log_unavailable<T>(app_id: AppId, endpoint: &'static str, fetch: &Fetch<T>) {
    if let Fetch::Unavailable(err) = fetch {
        warn!(%app_id, endpoint, error = %err, "fetch failed; fields left empty");
    }
}
