use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::row::AppId;

/// Why one endpoint produced no data for an app.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream answered with status {0}")]
    Status(u16),
    /// The usage chart does not exist for this app.
    #[error("nothing published for this app (status {0})")]
    NotFound(u16),
    #[error("response is not the expected JSON: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("response has no `{0}` object")]
    MissingField(&'static str),
}

/// Failures reading or writing the tabular store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tabular store {0} does not exist")]
    Missing(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("csv: {0}")]
    Csv(#[from] PolarsError),
    #[error("tabular store has no `{0}` column")]
    MissingColumn(&'static str),
    #[error("row {row}: column `{column}` holds unreadable value {value:?}")]
    Malformed {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("could not move the new store into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("no labeled rows left to train on")]
    EmptyTrainingSet,
    #[error("app {app_id}: ownership label {value:?} is not a number")]
    InvalidLabel { app_id: AppId, value: String },
    #[error("feature frame: {0}")]
    Frame(#[from] PolarsError),
    #[error("model: {0}")]
    Model(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
