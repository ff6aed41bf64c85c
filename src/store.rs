use std::fs;
use std::path::Path;
use std::str::FromStr;

use indexmap::IndexMap;
use polars::prelude::*;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::StoreError;
use crate::row::{AppId, StoreRow};

/// Column order of the CSV file. Always written, header included.
pub const COLUMNS: [&str; 10] = [
    "app_id",
    "total_reviews",
    "review_score",
    "is_free",
    "price",
    "release_date",
    "all_time_peak",
    "avg_count",
    "day_peak",
    "ownership",
];

/// Rows keyed by app id, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularStore {
    rows: IndexMap<AppId, StoreRow>,
}

impl TabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the whole file. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }

        // infer_schema(Some(0)) keeps every column as text; cells are parsed below
        let df = CsvReader::from_path(path)?
            .has_header(true)
            .infer_schema(Some(0))
            .finish()?;

        debug!(path = %path.display(), rows = df.height(), "loaded tabular store");
        Self::from_frame(&df)
    }

    /// Same as [`TabularStore::load`] but a missing file reads as an empty store.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        match Self::load(path) {
            Err(StoreError::Missing(_)) => Ok(Self::new()),
            other => other,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, app_id: AppId) -> Option<&StoreRow> {
        self.rows.get(&app_id)
    }

    /// Replaces the row for `row.app_id`, keeping its position. New ids go last.
    pub fn upsert(&mut self, row: StoreRow) -> Option<StoreRow> {
        self.rows.insert(row.app_id, row)
    }

    pub fn rows(&self) -> impl Iterator<Item = &StoreRow> {
        self.rows.values()
    }

    pub fn into_rows(self) -> Vec<StoreRow> {
        self.rows.into_values().collect()
    }

    /// Writes every row to a temporary file next to `path`, then renames it
    /// over `path`. A crash mid-write leaves the previous file intact.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut df = self.to_frame()?;
        let mut staged = NamedTempFile::new_in(dir)?;
        CsvWriter::new(staged.as_file_mut()).finish(&mut df)?;
        staged.as_file().sync_all()?;
        staged.persist(path)?;

        debug!(path = %path.display(), rows = self.len(), "wrote tabular store");
        Ok(())
    }

    fn to_frame(&self) -> PolarsResult<DataFrame> {
        let rows: Vec<&StoreRow> = self.rows.values().collect();
        let column = |name: &str, cell: fn(&StoreRow) -> Option<String>| {
            let values: Vec<Option<String>> = rows.iter().map(|row| cell(row)).collect();
            Series::new(name, values)
        };

        DataFrame::new(vec![
            column(COLUMNS[0], |row| Some(row.app_id.to_string())),
            column(COLUMNS[1], |row| row.total_reviews.map(|v| v.to_string())),
            column(COLUMNS[2], |row| row.review_score.map(|v| v.to_string())),
            column(COLUMNS[3], |row| row.is_free.map(format_flag)),
            column(COLUMNS[4], |row| row.price.map(|v| v.to_string())),
            column(COLUMNS[5], |row| row.release_date.clone()),
            column(COLUMNS[6], |row| row.all_time_peak.map(format_number)),
            column(COLUMNS[7], |row| row.avg_count.map(format_number)),
            column(COLUMNS[8], |row| row.day_peak.map(format_number)),
            column(COLUMNS[9], |row| row.ownership.clone()),
        ])
    }

    fn from_frame(df: &DataFrame) -> Result<Self, StoreError> {
        let mut cells = Vec::with_capacity(COLUMNS.len());
        for name in COLUMNS {
            cells.push(text_column(df, name)?);
        }

        let mut store = Self::new();
        for index in 0..df.height() {
            let cell = |column: usize| Cell {
                row: index + 1,
                column: COLUMNS[column],
                value: cells[column][index].as_deref(),
            };

            let app_id = cell(0)
                .parse::<AppId>()?
                .ok_or_else(|| cell(0).malformed())?;
            let row = StoreRow {
                app_id,
                total_reviews: cell(1).integer()?,
                review_score: cell(2).integer()?,
                is_free: cell(3).flag()?,
                price: cell(4).integer()?,
                release_date: cell(5).text(),
                all_time_peak: cell(6).parse()?,
                avg_count: cell(7).parse()?,
                day_peak: cell(8).parse()?,
                ownership: cell(9).text(),
            };
            store.upsert(row);
        }
        Ok(store)
    }
}

fn text_column(df: &DataFrame, name: &'static str) -> Result<Vec<Option<String>>, StoreError> {
    let series = df
        .column(name)
        .map_err(|_| StoreError::MissingColumn(name))?
        .cast(&DataType::Utf8)?;
    let values = series
        .utf8()?
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(values)
}

struct Cell<'a> {
    row: usize,
    column: &'static str,
    value: Option<&'a str>,
}

impl Cell<'_> {
    fn malformed(&self) -> StoreError {
        StoreError::Malformed {
            row: self.row,
            column: self.column,
            value: self.value.unwrap_or_default().to_string(),
        }
    }

    fn text(&self) -> Option<String> {
        self.value.map(str::to_string)
    }

    fn parse<T: FromStr>(&self) -> Result<Option<T>, StoreError> {
        self.value
            .map(|value| value.parse().map_err(|_| self.malformed()))
            .transpose()
    }

    // Counts may have been written as `1200.0` by other tools.
    fn integer<T>(&self) -> Result<Option<T>, StoreError>
    where
        T: FromStr + TryFrom<i64>,
    {
        let Some(value) = self.value else {
            return Ok(None);
        };
        if let Ok(parsed) = value.parse::<T>() {
            return Ok(Some(parsed));
        }
        match value.parse::<f64>() {
            Ok(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                T::try_from(float as i64).map(Some).map_err(|_| self.malformed())
            }
            _ => Err(self.malformed()),
        }
    }

    fn flag(&self) -> Result<Option<bool>, StoreError> {
        match self.value {
            None => Ok(None),
            Some("True" | "true" | "1") => Ok(Some(true)),
            Some("False" | "false" | "0") => Ok(Some(false)),
            Some(_) => Err(self.malformed()),
        }
    }
}

fn format_flag(flag: bool) -> String {
    if flag { "True" } else { "False" }.to_string()
}

fn format_number(value: f64) -> String {
    // Display gives `10` for 10.0 and the shortest round-trip form otherwise
    value.to_string()
}
