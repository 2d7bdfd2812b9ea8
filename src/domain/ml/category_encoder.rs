//! Integer codes for categorical columns.
//!
//! The encoder is fit once on the training frame and stored inside the model
//! artifact, so inference maps values to the same codes the classifier saw.

use crate::domain::errors::TransformError;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    /// Sorted distinct values per column; a value's code is its index
    classes: BTreeMap<String, Vec<String>>,
}

impl CategoryEncoder {
    /// Learns the vocabulary of each column
    pub fn fit(df: &DataFrame, columns: &[&str]) -> Result<Self, TransformError> {
        let mut classes = BTreeMap::new();
        for &column in columns {
            let values = text_values(df, column)?;
            let mut distinct = BTreeSet::new();
            for (row, value) in values.iter().enumerate() {
                distinct.insert(key(column, row, value)?.to_string());
            }
            classes.insert(column.to_string(), distinct.into_iter().collect());
        }
        Ok(Self { classes })
    }

    /// Replaces every fitted column with its `Int64` codes
    pub fn transform(&self, df: &mut DataFrame) -> Result<(), TransformError> {
        for (column, vocabulary) in &self.classes {
            let values = text_values(df, column)?;
            let codes = values
                .iter()
                .enumerate()
                .map(|(row, value)| {
                    let value = key(column, row, value)?;
                    vocabulary
                        .binary_search_by(|class| class.as_str().cmp(value))
                        .map(|code| code as i64)
                        .map_err(|_| TransformError::Encoding {
                            column: column.clone(),
                            reason: format!("unseen value '{}' at row {}", value, row),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            df.with_column(Column::new(column.as_str().into(), codes))
                .map_err(|e| encoding(column, e))?;
        }
        Ok(())
    }

    pub fn code(&self, column: &str, value: &str) -> Option<i64> {
        self.classes
            .get(column)?
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .map(|code| code as i64)
    }
}

/// The column rendered as text, so numeric categories encode too
fn text_values(df: &DataFrame, column: &str) -> Result<StringChunked, TransformError> {
    let as_text = df
        .column(column)
        .and_then(|c| c.cast(&DataType::String))
        .map_err(|e| encoding(column, e))?;
    as_text.str().cloned().map_err(|e| encoding(column, e))
}

fn key<'a>(column: &str, row: usize, value: Option<&'a str>) -> Result<&'a str, TransformError> {
    value.ok_or_else(|| TransformError::Encoding {
        column: column.to_string(),
        reason: format!("null value at row {}", row),
    })
}

fn encoding(column: &str, error: PolarsError) -> TransformError {
    TransformError::Encoding {
        column: column.to_string(),
        reason: error.to_string(),
    }
}
