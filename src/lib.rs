//! Steam app statistics collection and ownership-model training.
//!
//! The collector fills a CSV tabular store from the Steam storefront and
//! steamcharts; the trainer fits a boosted-tree regressor on the rows that
//! carry a hand-entered ownership label.

pub mod collector;
pub mod config;
pub mod error;
pub mod row;
pub mod store;
pub mod trainer;

pub use collector::{CollectReport, Collector, Fetch};
pub use config::AppConfig;
pub use error::{FetchError, StoreError, TrainError};
pub use row::{AppId, StoreRow};
pub use store::TabularStore;
pub use trainer::{OwnershipModel, TrainReport, Trainer};
