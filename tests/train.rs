mod common;

use std::fs;
use std::path::Path;

use common::{settings, FakeApp, FakeSource};
use steam_ownership::config::TrainerSettings;
use steam_ownership::store::COLUMNS;
use steam_ownership::trainer::feature_vector;
use steam_ownership::{AppId, Collector, OwnershipModel, TabularStore, TrainError, Trainer};

/// Collects `count` paid apps whose ownership scales with their reviews and
/// labels all but the last one.
fn labeled_store(path: &Path, count: u32) {
    let mut fake = FakeSource::new();
    for i in 1..=count {
        fake = fake.app(FakeApp::paid(i, 999 + u64::from(i) * 100, u64::from(i) * 1000, u64::from(i) * 50));
    }
    let ids: Vec<AppId> = (1..=count).map(AppId).collect();
    Collector::new(fake, settings()).run(&ids, path).unwrap();

    let mut store = TabularStore::load(path).unwrap();
    for i in 1..count {
        let mut row = store.get(AppId(i)).unwrap().clone();
        row.ownership = Some((i * 20_000).to_string());
        store.upsert(row);
    }
    store.save(path).unwrap();
}

fn quick_settings() -> TrainerSettings {
    TrainerSettings {
        trees: 30,
        ..TrainerSettings::default()
    }
}

#[test]
fn trains_on_labeled_rows_and_writes_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    let model_path = dir.path().join("steam_model.json");
    labeled_store(&store_path, 10);

    let report = Trainer::new(quick_settings())
        .run(&store_path, &model_path)
        .unwrap();

    assert_eq!(report.labeled_rows, 9);
    assert_eq!(report.training_rows, 9);
    assert!(report.evaluation.is_none());
    assert_eq!(report.model_path, model_path);
    assert!(fs::metadata(&model_path).unwrap().len() > 0);

    // the unlabeled app can still be estimated with the saved model
    let store = TabularStore::load(&store_path).unwrap();
    let unlabeled = store.get(AppId(10)).unwrap();
    let features = feature_vector(unlabeled).unwrap();
    let model = OwnershipModel::load(&model_path).unwrap();
    assert!(model.predict(&features).is_finite());
}

#[test]
fn retraining_overwrites_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    let model_path = dir.path().join("steam_model.json");
    labeled_store(&store_path, 6);
    fs::write(&model_path, "stale").unwrap();

    Trainer::new(quick_settings())
        .run(&store_path, &model_path)
        .unwrap();

    assert_ne!(fs::read_to_string(&model_path).unwrap(), "stale");
    assert!(OwnershipModel::load(&model_path).is_ok());
}

#[test]
fn holdout_produces_scores() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    let model_path = dir.path().join("steam_model.json");
    labeled_store(&store_path, 11);

    let settings = TrainerSettings {
        test_fraction: 0.2,
        seed: Some(42),
        ..quick_settings()
    };
    let report = Trainer::new(settings).run(&store_path, &model_path).unwrap();

    assert_eq!(report.labeled_rows, 10);
    assert_eq!(report.training_rows, 8);
    let scores = report.evaluation.unwrap();
    assert_eq!(scores.samples, 2);
    assert!(scores.rmse.is_finite() && scores.rmse >= 0.0);
    assert!(scores.r2 <= 1.0);
}

#[test]
fn no_labels_means_no_model() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    let model_path = dir.path().join("steam_model.json");
    labeled_store(&store_path, 1);

    let err = Trainer::new(quick_settings())
        .run(&store_path, &model_path)
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<TrainError>(),
        Some(TrainError::EmptyTrainingSet)
    ));
    assert!(!model_path.exists());
}

#[test]
fn paid_rows_without_price_are_left_out() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    let model_path = dir.path().join("steam_model.json");
    fs::write(
        &store_path,
        format!(
            "{}\n1,100,7,False,,\"Oct 30, 2017\",10,5,4,1000\n2,200,8,True,,2019,20,9,8,3000\n3,300,6,False,499,Coming soon,30,12,10,5000\n",
            COLUMNS.join(",")
        ),
    )
    .unwrap();

    let report = Trainer::new(quick_settings())
        .run(&store_path, &model_path)
        .unwrap();

    assert_eq!(report.labeled_rows, 3);
    assert_eq!(report.training_rows, 2);
}

#[test]
fn missing_store_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let err = Trainer::new(quick_settings())
        .run(&dir.path().join("absent.csv"), &dir.path().join("model.json"))
        .unwrap_err();

    assert!(err.to_string().contains("loading tabular store"));
}

#[test]
fn load_drops_unlabeled_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("steam_data.csv");
    labeled_store(&store_path, 4);

    let rows = Trainer::load(&store_path).unwrap();
    let ids: Vec<AppId> = rows.iter().map(|row| row.app_id).collect();
    assert_eq!(ids, vec![AppId(1), AppId(2), AppId(3)]);
}
