use ndarray::{s, Array1, Array2};
use std::path::Path;
use tracing::{debug, error};

use crate::error::{EvalError, Result};

pub const TEST_FILE_NAME: &str = "test_bow.csv";

/// Numeric table read from a bag-of-words CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub values: Array2<f64>,
}

impl Table {
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.values.ncols()
    }

    /// Split into features (all columns but the last) and labels (last column).
    ///
    /// Upstream feature extraction writes the label as the final column; the
    /// header names are not consulted.
    pub fn split_label(&self) -> Result<(Array2<f64>, Array1<f64>)> {
        let n_cols = self.n_cols();
        if n_cols < 2 {
            return Err(EvalError::Parse {
                path: TEST_FILE_NAME.into(),
                reason: format!(
                    "expected at least one feature column and a label column, found {} column(s)",
                    n_cols
                ),
            });
        }
        let features = self.values.slice(s![.., ..n_cols - 1]).to_owned();
        let labels = self.values.column(n_cols - 1).to_owned();
        Ok((features, labels))
    }
}

fn parse_cell(raw: &str, column: &str, row: usize, path: &Path) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(f64::NAN);
    }
    trimmed.parse::<f64>().map_err(|_| {
        EvalError::parse(
            path,
            format!(
                "value '{}' in column '{}' (row {}) is not a number",
                trimmed, column, row + 1
            ),
        )
    })
}

pub fn parse_table<R: std::io::Read>(reader: R, path: &Path) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()
        .map_err(|e| EvalError::parse(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if columns.is_empty() {
        return Err(EvalError::EmptyData {
            path: path.to_path_buf(),
        });
    }

    let mut values = Vec::new();
    let mut n_rows = 0;
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| EvalError::parse(path, e))?;
        for (raw, column) in record.iter().zip(&columns) {
            values.push(parse_cell(raw, column, row, path)?);
        }
        n_rows += 1;
    }

    if n_rows == 0 {
        return Err(EvalError::EmptyData {
            path: path.to_path_buf(),
        });
    }

    let values = Array2::from_shape_vec((n_rows, columns.len()), values)
        .map_err(|e| EvalError::Unexpected(format!("building table: {}", e)))?;
    Ok(Table { columns, values })
}

pub fn load_data(directory: &Path) -> Result<Table> {
    let path = directory.join(TEST_FILE_NAME);
    let result = std::fs::File::open(&path)
        .map_err(|e| EvalError::from_read("test data file", &path, e))
        .and_then(|file| parse_table(file, &path));

    match &result {
        Ok(table) => debug!(
            path = %path.display(),
            rows = table.n_rows(),
            columns = table.n_cols(),
            "Test data loaded"
        ),
        Err(e @ EvalError::NotFound { .. }) => {
            error!("Error: File not found in path {}. Details: {}", directory.display(), e)
        }
        Err(e @ EvalError::EmptyData { .. }) => error!("Error: The CSV file is empty. {}", e),
        Err(e @ EvalError::Parse { .. }) => error!("Error parsing the CSV file: {}", e),
        Err(e) => error!("An unexpected error occurred while loading data: {}", e),
    }
    result
}
