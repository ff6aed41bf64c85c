use std::fmt;
use std::fs;
use std::path::Path;

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec, ValueType};
use gbdt::gradient_boost::GBDT;
use polars::prelude::*;

use crate::config::TrainerSettings;
use crate::error::TrainError;
use crate::trainer::features::{FeatureVector, FEATURE_COUNT, TARGET_COLUMN};

/// Boosted-tree regressor predicting the ownership label.
pub struct OwnershipModel {
    booster: GBDT,
}

impl fmt::Debug for OwnershipModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnershipModel").finish_non_exhaustive()
    }
}

impl OwnershipModel {
    /// Squared-error regression over every row of `x`.
    pub fn fit(x: &DataFrame, y: &DataFrame, settings: &TrainerSettings) -> Result<Self, TrainError> {
        let features = matrix_rows(x)?;
        let labels: Vec<ValueType> = y
            .column(TARGET_COLUMN)?
            .cast(&DataType::Float32)?
            .f32()?
            .into_no_null_iter()
            .collect();

        if features.is_empty() {
            return Err(TrainError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(TrainError::Model(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let mut training: DataVec = features
            .into_iter()
            .zip(labels)
            .map(|(feature, label)| Data::new_training_data(feature, 1.0, label, None))
            .collect();

        let mut booster = GBDT::new(&booster_config(settings));
        booster.fit(&mut training);
        Ok(Self { booster })
    }

    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let sample = features.iter().map(|&value| value as ValueType).collect();
        let predictions = self.booster.predict(&vec![Data::new_test_data(sample, None)]);
        predictions.first().copied().unwrap_or_default() as f64
    }

    pub fn predict_frame(&self, x: &DataFrame) -> Result<Vec<f64>, TrainError> {
        let samples: DataVec = matrix_rows(x)?
            .into_iter()
            .map(|feature| Data::new_test_data(feature, None))
            .collect();
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .booster
            .predict(&samples)
            .into_iter()
            .map(f64::from)
            .collect())
    }

    /// Writes the model to `path`, replacing any previous file.
    pub fn save(&self, path: &Path) -> Result<(), TrainError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.booster
            .save_model(utf8_path(path)?)
            .map_err(|err| TrainError::Model(format!("saving {}: {err}", path.display())))
    }

    pub fn load(path: &Path) -> Result<Self, TrainError> {
        let booster = GBDT::load_model(utf8_path(path)?)
            .map_err(|err| TrainError::Model(format!("loading {}: {err}", path.display())))?;
        Ok(Self { booster })
    }
}

fn booster_config(settings: &TrainerSettings) -> Config {
    let mut config = Config::new();
    config.set_feature_size(FEATURE_COUNT);
    config.set_loss("SquaredError");
    config.set_iterations(settings.trees);
    config.set_max_depth(settings.max_depth);
    config.set_shrinkage(settings.shrinkage);
    config.set_min_leaf_size(1);
    config.set_data_sample_ratio(1.0);
    config.set_feature_sample_ratio(1.0);
    config.set_debug(false);
    config
}

// Row-major f32 rows, the layout gbdt consumes.
fn matrix_rows(x: &DataFrame) -> Result<Vec<Vec<ValueType>>, TrainError> {
    if x.height() == 0 {
        return Ok(Vec::new());
    }
    let matrix = x.to_ndarray::<Float32Type>(IndexOrder::C)?;
    Ok(matrix.outer_iter().map(|row| row.to_vec()).collect())
}

fn utf8_path(path: &Path) -> Result<&str, TrainError> {
    path.to_str()
        .ok_or_else(|| TrainError::Model(format!("path {} is not UTF-8", path.display())))
}

/// Held-out scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub samples: usize,
    pub rmse: f64,
    /// RMSE as a percentage of the mean actual label. `None` when that mean
    /// is zero.
    pub relative_rmse: Option<f64>,
    pub r2: f64,
}

impl Evaluation {
    pub fn score(predictions: &[f64], actual: &[f64]) -> Option<Self> {
        if actual.is_empty() || predictions.len() != actual.len() {
            return None;
        }
        let n = actual.len() as f64;
        let mean = actual.iter().sum::<f64>() / n;

        let ss_res: f64 = predictions
            .iter()
            .zip(actual)
            .map(|(p, a)| (a - p).powi(2))
            .sum();
        let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

        let rmse = (ss_res / n).sqrt();
        // constant targets: perfect fit scores 1, anything else 0
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - ss_res / ss_tot
        };

        Some(Self {
            samples: actual.len(),
            rmse,
            relative_rmse: (mean != 0.0).then(|| rmse / mean * 100.0),
            r2,
        })
    }
}
