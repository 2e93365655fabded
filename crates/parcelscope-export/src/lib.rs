//! Export layer: flattens batch results into spreadsheet rows and writes
//! them as CSV or Parquet.

mod error;
pub mod rows;
pub mod writer;

pub use error::ExportError;
pub use rows::{DEFAULT_FIELDS, ExportLayout, OWNER_COLUMNS, PLACEHOLDER};
pub use writer::{ExportFormat, write_csv, write_export, write_parquet};
