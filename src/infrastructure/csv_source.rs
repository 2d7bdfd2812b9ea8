//! CSV ingestion into a polars [`DataFrame`].
//!
//! Column types are inferred over the whole file: integer columns load as
//! `Int64`, decimal columns as `Float64`, everything else as `String`. Empty
//! cells become nulls.

use crate::domain::errors::PipelineError;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

fn options() -> CsvReadOptions {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
}

pub fn read_csv_bytes(data: &[u8]) -> Result<DataFrame, PipelineError> {
    let df = options()
        .into_reader_with_file_handle(Cursor::new(data))
        .finish()
        .map_err(|e| PipelineError::Csv(e.to_string()))?;
    debug!("Parsed CSV: {} rows x {} columns", df.height(), df.width());
    Ok(df)
}

pub fn read_csv_path(path: &Path) -> Result<DataFrame, PipelineError> {
    let df = options()
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| PipelineError::Csv(format!("Failed to read {:?}: {}", path, e)))?;
    debug!(
        "Loaded {:?}: {} rows x {} columns",
        path,
        df.height(),
        df.width()
    );
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_typing() {
        let csv = ",trans_date_trans_time,amt,city_pop,state,merch_zipcode\n\
                   0,2019-01-01 00:00:18,4.97,3495,NC,28705\n\
                   1,2019-01-01 00:00:44,107,149,WA,\n";
        let df = read_csv_bytes(csv.as_bytes()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names_str()[0], "");
        assert_eq!(df.column("amt").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("city_pop").unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            df.column("state").unwrap().str().unwrap().get(1),
            Some("WA")
        );
        assert_eq!(df.column("merch_zipcode").unwrap().null_count(), 1);
        assert_eq!(
            df.column("trans_date_trans_time")
                .unwrap()
                .str()
                .unwrap()
                .get(0),
            Some("2019-01-01 00:00:18")
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(matches!(read_csv_bytes(b""), Err(PipelineError::Csv(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = read_csv_path(Path::new("/nonexistent/transactions.csv"));
        assert!(matches!(result, Err(PipelineError::Csv(_))));
    }

    #[test]
    fn test_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transactions.csv");
        std::fs::write(&path, "amt,is_fraud\n12.5,0\n3000.0,1\n").unwrap();

        let df = read_csv_path(&path).unwrap();
        assert_eq!(df.shape(), (2, 2));
        assert_eq!(df.column("is_fraud").unwrap().dtype(), &DataType::Int64);
    }
}
