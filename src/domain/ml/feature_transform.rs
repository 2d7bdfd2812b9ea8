//! Raw transaction frame → model-ready feature frame.
//!
//! The steps run in a fixed order and each one either returns the rewritten
//! frame or a step-specific [`TransformError`]. Nothing is returned on failure.

use crate::domain::errors::TransformError;
use crate::domain::ml::category_encoder::CategoryEncoder;
use crate::domain::ml::feature_registry::{
    AMOUNT_COLUMN, CATEGORICAL_COLUMNS, DOB_COLUMN, DROPPED_COLUMNS, OUTLIER_AMOUNT_THRESHOLD,
    TIMESTAMP_COLUMN,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

const TIME_PARTS: [&str; 7] = [
    "trans_year",
    "trans_month",
    "trans_day",
    "trans_hour",
    "trans_minute",
    "trans_second",
    "trans_weekday",
];

const BIRTH_YEAR: &str = "birth_year";

/// Encoder handling for step 3
pub enum EncoderMode<'a> {
    /// Learn codes from this frame (training)
    Fit,
    /// Apply codes learned at training time (inference)
    Reuse(&'a CategoryEncoder),
}

/// Runs the pipeline and learns a fresh encoder from the frame
pub fn fit_transform(df: DataFrame) -> Result<(DataFrame, CategoryEncoder), TransformError> {
    run(df, EncoderMode::Fit)
}

/// Runs the pipeline with an encoder fit on the training data
pub fn transform(df: DataFrame, encoder: &CategoryEncoder) -> Result<DataFrame, TransformError> {
    run(df, EncoderMode::Reuse(encoder)).map(|(df, _)| df)
}

pub fn run(
    df: DataFrame,
    mode: EncoderMode<'_>,
) -> Result<(DataFrame, CategoryEncoder), TransformError> {
    let df = decompose_timestamp(df)?;
    let df = drop_identifier_columns(df);
    let (df, encoder) = encode_categoricals(df, mode)?;
    let df = add_weekend_flag(df)?;
    let df = add_night_flag(df)?;
    let df = add_card_holder_age(df)?;
    let df = filter_amount_outliers(df)?;
    Ok((df, encoder))
}

/// Parses a timestamp the way the upstream CSV exports write them.
/// A bare date is read as midnight.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Removes `column` and reads it as text, one entry per row
fn take_text_column(df: &mut DataFrame, column: &str) -> PolarsResult<StringChunked> {
    let taken = df.drop_in_place(column)?.cast(&DataType::String)?;
    taken.str().cloned()
}

fn decompose_timestamp(mut df: DataFrame) -> Result<DataFrame, TransformError> {
    let fail = |reason: String| TransformError::TimeDecomposition { reason };

    let stamps = take_text_column(&mut df, TIMESTAMP_COLUMN).map_err(|e| fail(e.to_string()))?;

    let mut parts: [Vec<i64>; 7] = Default::default();
    for (row, raw) in stamps.iter().enumerate() {
        let dt = raw
            .and_then(parse_datetime)
            .ok_or_else(|| fail(format!("unparseable value {:?} at row {}", raw, row)))?;

        let values = [
            dt.year() as i64,
            dt.month() as i64,
            dt.day() as i64,
            dt.hour() as i64,
            dt.minute() as i64,
            dt.second() as i64,
            dt.weekday().num_days_from_monday() as i64,
        ];
        for (part, value) in parts.iter_mut().zip(values) {
            part.push(value);
        }
    }

    for (name, values) in TIME_PARTS.into_iter().zip(parts) {
        df.with_column(Column::new(name.into(), values))
            .map_err(|e| fail(e.to_string()))?;
    }
    Ok(df)
}

/// Best effort: absent columns are skipped
fn drop_identifier_columns(df: DataFrame) -> DataFrame {
    df.drop_many(DROPPED_COLUMNS.iter().copied())
}

fn encode_categoricals(
    mut df: DataFrame,
    mode: EncoderMode<'_>,
) -> Result<(DataFrame, CategoryEncoder), TransformError> {
    let encoder = match mode {
        EncoderMode::Fit => CategoryEncoder::fit(&df, CATEGORICAL_COLUMNS)?,
        EncoderMode::Reuse(encoder) => encoder.clone(),
    };
    encoder.transform(&mut df)?;
    Ok((df, encoder))
}

fn add_weekend_flag(df: DataFrame) -> Result<DataFrame, TransformError> {
    let is_weekend = col("trans_weekday").gt_eq(lit(5));
    with_flag(df, is_weekend, "is_weekend")
        .map_err(|e| TransformError::WeekendFlag { reason: e.to_string() })
}

fn add_night_flag(df: DataFrame) -> Result<DataFrame, TransformError> {
    let is_night = col("trans_hour")
        .lt(lit(6))
        .or(col("trans_hour").gt_eq(lit(22)));
    with_flag(df, is_night, "is_night")
        .map_err(|e| TransformError::NightFlag { reason: e.to_string() })
}

/// Appends a boolean expression as a 0/1 `Int64` column
fn with_flag(df: DataFrame, predicate: Expr, target: &str) -> PolarsResult<DataFrame> {
    df.lazy()
        .with_column(predicate.strict_cast(DataType::Int64).alias(target))
        .collect()
}

/// Age is the plain difference of calendar years
fn add_card_holder_age(mut df: DataFrame) -> Result<DataFrame, TransformError> {
    let fail = |reason: String| TransformError::HolderAge { reason };

    let births = take_text_column(&mut df, DOB_COLUMN).map_err(|e| fail(e.to_string()))?;
    let birth_years = births
        .iter()
        .enumerate()
        .map(|(row, dob)| {
            dob.and_then(parse_date)
                .map(|d| d.year() as i64)
                .ok_or_else(|| fail(format!("unparseable date of birth {:?} at row {}", dob, row)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    df.with_column(Column::new(BIRTH_YEAR.into(), birth_years))
        .map_err(|e| fail(e.to_string()))?;
    let age = col("trans_year").strict_cast(DataType::Int64) - col(BIRTH_YEAR);
    df.lazy()
        .with_column(age.alias("card_holder_age"))
        .drop([BIRTH_YEAR])
        .collect()
        .map_err(|e| fail(e.to_string()))
}

/// Keeps rows with `amt <= 2700`; a null amount is dropped
fn filter_amount_outliers(df: DataFrame) -> Result<DataFrame, TransformError> {
    df.lazy()
        .filter(
            col(AMOUNT_COLUMN)
                .strict_cast(DataType::Float64)
                .lt_eq(lit(OUTLIER_AMOUNT_THRESHOLD)),
        )
        .collect()
        .map_err(|e| TransformError::OutlierFilter { reason: e.to_string() })
}
