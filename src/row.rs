use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Steam app id of a tracked title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u32);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AppId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(AppId)
    }
}

impl From<u32> for AppId {
    fn from(id: u32) -> Self {
        AppId(id)
    }
}

/// One line of the tabular store.
///
/// Every statistic is optional: a failed or empty fetch leaves the field
/// absent rather than dropping the row. `ownership` is the hand-entered
/// label and is the only field that survives re-collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRow {
    pub app_id: AppId,
    pub total_reviews: Option<u64>,
    pub review_score: Option<i64>,
    pub is_free: Option<bool>,
    /// Price in cents, only present for paid apps.
    pub price: Option<u64>,
    pub release_date: Option<String>,
    pub all_time_peak: Option<f64>,
    pub avg_count: Option<f64>,
    pub day_peak: Option<f64>,
    pub ownership: Option<String>,
}

impl StoreRow {
    pub fn new(app_id: AppId) -> Self {
        Self {
            app_id,
            total_reviews: None,
            review_score: None,
            is_free: None,
            price: None,
            release_date: None,
            all_time_peak: None,
            avg_count: None,
            day_peak: None,
            ownership: None,
        }
    }

    /// The label, if one has been entered.
    pub fn label(&self) -> Option<&str> {
        self.ownership
            .as_deref()
            .map(str::trim)
            .filter(|label| !label.is_empty())
    }

    pub fn has_label(&self) -> bool {
        self.label().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_id_parses_surrounding_whitespace() {
        assert_eq!(" 730 ".parse::<AppId>().unwrap(), AppId(730));
        assert!("abc".parse::<AppId>().is_err());
    }

    #[test]
    fn blank_ownership_is_not_a_label() {
        let mut row = StoreRow::new(AppId(1));
        assert!(!row.has_label());

        row.ownership = Some("   ".to_string());
        assert!(!row.has_label());

        row.ownership = Some(" 1500 ".to_string());
        assert_eq!(row.label(), Some("1500"));
    }
}
