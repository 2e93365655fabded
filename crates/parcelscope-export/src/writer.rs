//! CSV and Parquet writers for export batches.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parcelscope_core::ParcelResult;
use parquet::arrow::ArrowWriter;
use tracing::info;

use crate::{ExportError, ExportLayout};

/// UTF-8 byte order mark; spreadsheet tools need it to detect Hangul text.
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    /// Pick the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Result<Self, ExportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") => Ok(Self::Csv),
            Some("parquet") => Ok(Self::Parquet),
            _ => Err(ExportError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Write `batch` as a header-first CSV file.
pub fn write_csv(path: &Path, batch: &RecordBatch) -> Result<(), ExportError> {
    let mut file = BufWriter::new(File::create(path)?);
    file.write_all(UTF8_BOM)?;
    let mut writer = arrow::csv::WriterBuilder::new()
        .with_header(true)
        .build(file);
    writer.write(batch)?;
    writer.into_inner().flush()?;
    Ok(())
}

pub fn write_parquet(path: &Path, batch: &RecordBatch) -> Result<(), ExportError> {
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Flatten `results` with `layout` and write them to `path`.
///
/// Returns the number of rows written.
pub fn write_export(
    path: &Path,
    layout: &ExportLayout,
    results: &[ParcelResult],
) -> Result<usize, ExportError> {
    let format = ExportFormat::from_path(path)?;
    let batch = layout.to_record_batch(results)?;
    match format {
        ExportFormat::Csv => write_csv(path, &batch)?,
        ExportFormat::Parquet => write_parquet(path, &batch)?,
    }
    info!(path = %path.display(), format = ?format, rows = batch.num_rows(), "export written");
    Ok(batch.num_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::AsArray;
    use parcelscope_core::{NormalizedRecord, OwnerRecord, ParcelRef};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use serde_json::json;
    use tempfile::TempDir;

    fn read_back(path: &Path) -> Vec<RecordBatch> {
        let file = File::open(path).unwrap();
        ParquetRecordBatchReaderBuilder::try_new(file)
            .unwrap()
            .build()
            .unwrap()
            .map(|b| b.unwrap())
            .collect()
    }

    fn results() -> Vec<ParcelResult> {
        let mut record = NormalizedRecord::new();
        record.insert("bldNm", json!("정자 타워"));
        record.set_owners(&[
            OwnerRecord {
                name: "Kim".into(),
                ..Default::default()
            },
            OwnerRecord {
                name: "Park".into(),
                ..Default::default()
            },
        ]);
        let mut done = ParcelResult::ready(ParcelRef {
            identifier: "4113510300104150023".into(),
            address: "경기도 성남시 분당구 정자동 415-23".into(),
        });
        done.mark_done(record);

        let mut failed = ParcelResult::ready(ParcelRef {
            identifier: "4113510300104160000".into(),
            address: "경기도 성남시 분당구 정자동 416".into(),
        });
        failed.mark_failed("no data");
        vec![done, failed]
    }

    fn layout() -> ExportLayout {
        ExportLayout::new(["bldNm"])
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.CSV")).unwrap(), ExportFormat::Csv);
        assert_eq!(
            ExportFormat::from_path(Path::new("a/b.parquet")).unwrap(),
            ExportFormat::Parquet
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("out.xlsx")),
            Err(ExportError::UnsupportedFormat(_))
        ));
        assert!(ExportFormat::from_path(Path::new("out")).is_err());
    }

    #[test]
    fn csv_export_round_trips_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcels.csv");
        let rows = write_export(&path, &layout(), &results()).unwrap();
        assert_eq!(rows, 3);

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("no,identifier,address,status,reason,bldNm,owner_no"));
        assert!(lines[1].contains("정자 타워"));
        assert!(lines[2].contains(",2,Park,"));
        assert!(lines[3].contains("no data"));
    }

    #[test]
    fn parquet_export_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcels.parquet");
        write_export(&path, &layout(), &results()).unwrap();

        let batches = read_back(&path);
        let total: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(total, 3);

        let batch = &batches[0];
        let owners = batch.column_by_name("owner_name").unwrap().as_string::<i32>();
        assert_eq!(owners.value(0), "Kim");
        assert_eq!(owners.value(1), "Park");
        assert_eq!(owners.value(2), "-");
    }

    #[test]
    fn unsupported_extension_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("parcels.xlsx");
        assert!(write_export(&path, &layout(), &results()).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn missing_directory_is_io_error() {
        let err = write_export(Path::new("/nonexistent/parcels.parquet"), &layout(), &results())
            .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn csv_flush_failure_is_reported() {
        let batch = layout().to_record_batch(&results()).unwrap();
        assert!(write_csv(Path::new("/dev/full"), &batch).is_err());
    }
}
