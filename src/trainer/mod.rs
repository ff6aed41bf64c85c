pub mod features;
pub mod model;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::config::TrainerSettings;
use crate::error::TrainError;
use crate::row::StoreRow;
use crate::store::TabularStore;

pub use features::{derive_features, feature_vector, FeatureVector};
pub use model::{Evaluation, OwnershipModel};

#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub labeled_rows: usize,
    pub training_rows: usize,
    /// Present only when part of the data was held out.
    pub evaluation: Option<Evaluation>,
    pub model_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    settings: TrainerSettings,
}

impl Trainer {
    pub fn new(settings: TrainerSettings) -> Self {
        Self { settings }
    }

    /// Reads the store and keeps only rows that carry a label.
    pub fn load(store_path: &Path) -> Result<Vec<StoreRow>> {
        let store = TabularStore::load(store_path)
            .with_context(|| format!("loading tabular store {}", store_path.display()))?;
        let total = store.len();
        let rows: Vec<StoreRow> = store
            .into_rows()
            .into_iter()
            .filter(StoreRow::has_label)
            .collect();

        info!(rows = total, labeled = rows.len(), "loaded tabular store");
        Ok(rows)
    }

    /// Load, derive features, fit and persist.
    pub fn run(&self, store_path: &Path, model_path: &Path) -> Result<TrainReport> {
        // 1. Load labeled rows
        let rows = Self::load(store_path)?;
        if rows.is_empty() {
            return Err(TrainError::EmptyTrainingSet.into());
        }

        // 2. Feature frame: features plus target
        let df = features::feature_frame(&rows)?;
        if df.height() == 0 {
            return Err(TrainError::EmptyTrainingSet.into());
        }

        // 3. Optionally hold part of it out
        let (train_df, test_df) = if self.settings.test_fraction > 0.0 {
            let (train_df, test_df) =
                train_test_split(&df, self.settings.test_fraction, self.settings.seed)?;
            (train_df, Some(test_df).filter(|test| test.height() > 0))
        } else {
            (df, None)
        };

        // 4. Split into features and target
        let (x_train, y_train) = features::split_features_and_target(&train_df)?;

        // 5. Fit the booster
        info!(
            rows = x_train.height(),
            trees = self.settings.trees,
            "fitting ownership model"
        );
        let model = OwnershipModel::fit(&x_train, &y_train, &self.settings)?;

        // 6. Score the held-out rows
        let evaluation = match test_df {
            Some(test_df) => evaluate(&model, &test_df)?,
            None => None,
        };
        if let Some(scores) = &evaluation {
            info!(
                samples = scores.samples,
                rmse = scores.rmse,
                relative_rmse_pct = scores.relative_rmse,
                r2 = scores.r2,
                "held-out evaluation"
            );
        }

        // 7. Persist
        model
            .save(model_path)
            .with_context(|| format!("saving model to {}", model_path.display()))?;
        info!(path = %model_path.display(), "model saved");

        Ok(TrainReport {
            labeled_rows: rows.len(),
            training_rows: x_train.height(),
            evaluation,
            model_path: model_path.to_path_buf(),
        })
    }
}

fn evaluate(model: &OwnershipModel, test_df: &DataFrame) -> Result<Option<Evaluation>, TrainError> {
    let (x_test, y_test) = features::split_features_and_target(test_df)?;
    let predictions = model.predict_frame(&x_test)?;
    let actual: Vec<f64> = y_test
        .column(features::TARGET_COLUMN)?
        .f64()?
        .into_no_null_iter()
        .collect();
    Ok(Evaluation::score(&predictions, &actual))
}

/// Shuffles row indices and cuts off `test_fraction` of them as the test set.
/// The training side always keeps at least one row.
pub fn train_test_split(
    df: &DataFrame,
    test_fraction: f64,
    seed: Option<u64>,
) -> PolarsResult<(DataFrame, DataFrame)> {
    // generate vector from 0 to # of rows in df
    let mut indices: Vec<u32> = (0..df.height() as u32).collect();

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let test_len = ((df.height() as f64) * test_fraction).round() as usize;
    let test_len = test_len.min(df.height().saturating_sub(1));
    let (test_indices, train_indices) = indices.split_at(test_len);

    let train_indices_ca = UInt32Chunked::from_vec("", train_indices.to_vec());
    let test_indices_ca = UInt32Chunked::from_vec("", test_indices.to_vec());

    let train_df = df.take(&train_indices_ca)?;
    let test_df = df.take(&test_indices_ca)?;

    Ok((train_df, test_df))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> DataFrame {
        DataFrame::new(vec![Series::new(
            "n",
            (0..n as i64).collect::<Vec<i64>>(),
        )])
        .unwrap()
    }

    #[test]
    fn split_sizes_and_disjointness() {
        let df = numbered(10);
        let (train, test) = train_test_split(&df, 0.2, Some(42)).unwrap();
        assert_eq!(train.height(), 8);
        assert_eq!(test.height(), 2);

        let mut all: Vec<i64> = train
            .column("n")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .chain(test.column("n").unwrap().i64().unwrap().into_no_null_iter())
            .collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<i64>>());
    }

    #[test]
    fn seeded_split_is_reproducible() {
        let df = numbered(20);
        let held_out = |seed| {
            let (_, test) = train_test_split(&df, 0.25, Some(seed)).unwrap();
            let values: Vec<i64> = test
                .column("n")
                .unwrap()
                .i64()
                .unwrap()
                .into_no_null_iter()
                .collect();
            values
        };
        assert_eq!(held_out(7), held_out(7));
        assert_eq!(held_out(7).len(), 5);
    }

    #[test]
    fn single_row_is_never_held_out() {
        let (train, test) = train_test_split(&numbered(1), 0.5, Some(1)).unwrap();
        assert_eq!(train.height(), 1);
        assert_eq!(test.height(), 0);
    }
}
