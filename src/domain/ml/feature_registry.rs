use crate::domain::errors::ValidationError;
use polars::prelude::*;

/// Ordered list of feature names.
/// This order is the column order of the training matrix; any change here
/// breaks every persisted model.
pub const FEATURE_NAMES: &[&str] = &[
    "trans_year",
    "trans_month",
    "trans_day",
    "trans_hour",
    "trans_minute",
    "trans_second",
    "trans_weekday",
    "category",
    "amt",
    "gender",
    "state",
    "lat",
    "long",
    "city_pop",
    "merch_lat",
    "merch_long",
    "is_weekend",
    "is_night",
    "card_holder_age",
];

pub const TARGET_COLUMN: &str = "is_fraud";
pub const PREDICTION_COLUMN: &str = "prediction";

pub const TIMESTAMP_COLUMN: &str = "trans_date_trans_time";
pub const DOB_COLUMN: &str = "dob";
pub const AMOUNT_COLUMN: &str = "amt";

pub const CATEGORICAL_COLUMNS: &[&str] = &["category", "gender", "state"];

/// Identifier and free-text columns removed before modelling.
/// The empty name is the unnamed index column some CSV writers emit.
pub const DROPPED_COLUMNS: &[&str] = &[
    "Unnamed: 0",
    "",
    "first",
    "last",
    "street",
    "city",
    "zip",
    "trans_num",
    "merch_zipcode",
    "cc_num",
    "merchant",
    "job",
    "unix_time",
];

/// Transactions above this amount are treated as outliers and removed
pub const OUTLIER_AMOUNT_THRESHOLD: f64 = 2700.0;

/// Contract plus the target column, as required for training
pub fn training_columns() -> Vec<&'static str> {
    FEATURE_NAMES
        .iter()
        .copied()
        .chain(std::iter::once(TARGET_COLUMN))
        .collect()
}

/// Fails with the exact missing set (in contract order) when any required
/// column is absent.
pub fn validate_required_columns(
    df: &DataFrame,
    required_columns: &[&str],
) -> Result<(), ValidationError> {
    let missing: Vec<String> = required_columns
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingColumns {
            missing,
            required: required_columns.iter().map(|c| c.to_string()).collect(),
        })
    }
}

/// Feature matrix in contract order, one `Vec` per row
pub fn features_to_matrix(df: &DataFrame) -> Result<Vec<Vec<f64>>, ValidationError> {
    let columns = FEATURE_NAMES
        .iter()
        .map(|name| numeric_values(df, name, FEATURE_NAMES))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((0..df.height())
        .map(|row| columns.iter().map(|values| values[row]).collect())
        .collect())
}

/// Binary labels from the target column
pub fn target_vector(df: &DataFrame) -> Result<Vec<i32>, ValidationError> {
    numeric_values(df, TARGET_COLUMN, &training_columns())?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
                Ok(value as i32)
            } else {
                Err(ValidationError::InvalidValue {
                    column: TARGET_COLUMN.to_string(),
                    row,
                })
            }
        })
        .collect()
}

/// Values of a numeric column as `f64`; nulls and NaN are rejected with
/// their row
fn numeric_values(
    df: &DataFrame,
    name: &str,
    required: &[&str],
) -> Result<Vec<f64>, ValidationError> {
    let column = df
        .column(name)
        .map_err(|_| ValidationError::MissingColumns {
            missing: vec![name.to_string()],
            required: required.iter().map(|c| c.to_string()).collect(),
        })?;

    let non_numeric = || ValidationError::NonNumericColumn {
        column: name.to_string(),
    };
    if !(column.dtype().is_primitive_numeric() || column.dtype().is_bool()) {
        return Err(non_numeric());
    }
    let as_float = column
        .cast(&DataType::Float64)
        .map_err(|_| non_numeric())?;
    let values = as_float.f64().map_err(|_| non_numeric())?;

    values
        .iter()
        .enumerate()
        .map(|(row, value)| {
            value
                .filter(|v| !v.is_nan())
                .ok_or_else(|| ValidationError::InvalidValue {
                    column: name.to_string(),
                    row,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(columns: &[&str]) -> DataFrame {
        DataFrame::new(
            columns
                .iter()
                .map(|c| Column::new((*c).into(), [1i64]))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_all_present_is_noop() {
        let df = frame_with(FEATURE_NAMES);
        assert!(validate_required_columns(&df, FEATURE_NAMES).is_ok());
    }

    #[test]
    fn test_reports_exact_missing_set() {
        for drop_count in 1..=FEATURE_NAMES.len() {
            let present: Vec<&str> = FEATURE_NAMES[drop_count..].to_vec();
            let df = frame_with(&present);

            match validate_required_columns(&df, FEATURE_NAMES) {
                Err(ValidationError::MissingColumns { missing, required }) => {
                    let expected: Vec<String> = FEATURE_NAMES[..drop_count]
                        .iter()
                        .map(|s| s.to_string())
                        .collect();
                    assert_eq!(missing, expected);
                    assert_eq!(required.len(), FEATURE_NAMES.len());
                }
                other => panic!("expected MissingColumns, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let mut names = FEATURE_NAMES.to_vec();
        names.push("unexpected");
        let df = frame_with(&names);
        assert!(validate_required_columns(&df, FEATURE_NAMES).is_ok());
    }

    #[test]
    fn test_matrix_follows_contract_order() {
        let mut df = frame_with(FEATURE_NAMES);
        df.with_column(Column::new("amt".into(), [12.5f64])).unwrap();
        df.with_column(Column::new("trans_year".into(), [2020i64])).unwrap();

        let matrix = features_to_matrix(&df).unwrap();
        assert_eq!(matrix.len(), 1);
        assert_eq!(matrix[0].len(), FEATURE_NAMES.len());
        assert_eq!(matrix[0][0], 2020.0);
        assert_eq!(matrix[0][8], 12.5);
    }

    #[test]
    fn test_matrix_rejects_text_and_nulls() {
        let mut df = frame_with(FEATURE_NAMES);
        df.with_column(Column::new("state".into(), ["NC"])).unwrap();
        assert_eq!(
            features_to_matrix(&df).unwrap_err(),
            ValidationError::NonNumericColumn {
                column: "state".to_string()
            }
        );

        let mut df = frame_with(FEATURE_NAMES);
        df.with_column(Column::new("lat".into(), [None::<f64>])).unwrap();
        assert_eq!(
            features_to_matrix(&df).unwrap_err(),
            ValidationError::InvalidValue {
                column: "lat".to_string(),
                row: 0
            }
        );
    }

    #[test]
    fn test_target_vector_parses_labels() {
        let df = df!(TARGET_COLUMN => [0.0f64, 1.0, 1.0]).unwrap();
        assert_eq!(target_vector(&df).unwrap(), vec![0, 1, 1]);

        let integers = df!(TARGET_COLUMN => [0i64, 1]).unwrap();
        assert_eq!(target_vector(&integers).unwrap(), vec![0, 1]);

        let bad = df!(TARGET_COLUMN => [0.0f64, 0.5]).unwrap();
        assert!(matches!(
            target_vector(&bad),
            Err(ValidationError::InvalidValue { row: 1, .. })
        ));

        let text = df!(TARGET_COLUMN => ["yes"]).unwrap();
        assert!(matches!(
            target_vector(&text),
            Err(ValidationError::NonNumericColumn { .. })
        ));
    }
}
