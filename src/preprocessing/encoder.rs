//! One-hot encoding of categorical feature columns

use crate::error::{Result, StockForestError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Vocabulary of a single categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnVocabulary {
    /// Categories in sorted order, one indicator column each
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl ColumnVocabulary {
    fn from_values<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let categories: Vec<String> = values
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();
        Self { categories, index }
    }
}

/// One-hot encoder.
///
/// Each input column expands into one indicator per category seen at fit
/// time. Categories not seen at fit time encode as an all-zero block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<ColumnVocabulary>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the vocabulary of each column. `rows[i][j]` is column `j` of row `i`.
    pub fn fit<R: AsRef<[S]>, S: AsRef<str>>(&mut self, rows: &[R]) -> Result<&mut Self> {
        let n_columns = rows
            .first()
            .map(|r| r.as_ref().len())
            .ok_or(StockForestError::EmptyDataset)?;

        self.check_width(rows, n_columns)?;

        self.vocabularies = (0..n_columns)
            .map(|j| ColumnVocabulary::from_values(rows.iter().map(|r| r.as_ref()[j].as_ref())))
            .collect();
        self.is_fitted = true;
        Ok(self)
    }

    /// Encode rows into indicator columns
    pub fn transform<R: AsRef<[S]>, S: AsRef<str>>(&self, rows: &[R]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(StockForestError::ModelNotFitted);
        }
        self.check_width(rows, self.vocabularies.len())?;

        let offsets = self.block_offsets();
        let mut out = Array2::zeros((rows.len(), self.n_output_columns()));

        for (i, row) in rows.iter().enumerate() {
            for (j, value) in row.as_ref().iter().enumerate() {
                if let Some(&k) = self.vocabularies[j].index.get(value.as_ref()) {
                    out[[i, offsets[j] + k]] = 1.0;
                }
            }
        }

        Ok(out)
    }

    pub fn fit_transform<R: AsRef<[S]>, S: AsRef<str>>(&mut self, rows: &[R]) -> Result<Array2<f64>> {
        self.fit(rows)?;
        self.transform(rows)
    }

    /// Total indicator columns across all inputs
    pub fn n_output_columns(&self) -> usize {
        self.vocabularies.iter().map(|v| v.categories.len()).sum()
    }

    /// Categories of input column `column`, in output order
    pub fn categories(&self, column: usize) -> Option<&[String]> {
        self.vocabularies.get(column).map(|v| v.categories.as_slice())
    }

    /// Output column names as `<input>_<category>`
    pub fn feature_names(&self, input_names: &[&str]) -> Vec<String> {
        self.vocabularies
            .iter()
            .zip(input_names)
            .flat_map(|(vocab, name)| {
                vocab
                    .categories
                    .iter()
                    .map(move |category| format!("{}_{}", name, category))
            })
            .collect()
    }

    fn block_offsets(&self) -> Vec<usize> {
        self.vocabularies
            .iter()
            .scan(0, |acc, v| {
                let start = *acc;
                *acc += v.categories.len();
                Some(start)
            })
            .collect()
    }

    fn check_width<R: AsRef<[S]>, S: AsRef<str>>(&self, rows: &[R], expected: usize) -> Result<()> {
        match rows.iter().find(|r| r.as_ref().len() != expected) {
            Some(row) => Err(StockForestError::ShapeError {
                expected: format!("{} categorical columns", expected),
                actual: format!("{} categorical columns", row.as_ref().len()),
            }),
            None => Ok(()),
        }
    }
}
