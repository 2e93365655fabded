//! Row flattening.
//!
//! One row per parcel, or one row per owner when the parcel carries owner
//! records. Owner rows repeat every parcel column and are numbered through
//! `owner_no`. Anything absent is written as [`PLACEHOLDER`].

use std::sync::Arc;

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parcelscope_core::{OwnerRecord, ParcelResult};

use crate::ExportError;

pub const PLACEHOLDER: &str = "-";

const PARCEL_COLUMNS: &[&str] = &["no", "identifier", "address", "status", "reason"];

/// Owner columns appended after the record fields.
pub const OWNER_COLUMNS: &[&str] = &[
    "owner_no",
    "owner_name",
    "owner_id",
    "owner_address",
    "owner_share",
    "owner_date",
    "owner_reason",
];

/// Registry fields exported when no explicit list is given.
pub const DEFAULT_FIELDS: &[&str] = &[
    "platPlc",
    "bldNm",
    "mainPurpsCdNm",
    "strctCdNm",
    "platArea",
    "archArea",
    "totArea",
    "bcRat",
    "vlRat",
    "grndFlrCnt",
    "ugrndFlrCnt",
    "useAprDay",
    "hhldCnt",
    "jijiguCdNm",
];

/// Which record fields become columns, in order.
#[derive(Debug, Clone)]
pub struct ExportLayout {
    fields: Vec<String>,
}

impl Default for ExportLayout {
    fn default() -> Self {
        Self::new(DEFAULT_FIELDS.iter().copied())
    }
}

impl ExportLayout {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> Vec<String> {
        PARCEL_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.fields.iter().cloned())
            .chain(OWNER_COLUMNS.iter().map(|c| c.to_string()))
            .collect()
    }

    /// Flatten results into rows of cell text, in the order of [`columns`](Self::columns).
    pub fn rows(&self, results: &[ParcelResult]) -> Vec<Vec<String>> {
        let mut rows = Vec::with_capacity(results.len());
        for (i, result) in results.iter().enumerate() {
            let mut base = vec![
                (i + 1).to_string(),
                cell(Some(result.parcel.identifier.clone())),
                cell(Some(result.parcel.address.clone())),
                result.status.as_str().to_string(),
                cell(Some(result.reason.clone())),
            ];
            base.extend(self.fields.iter().map(|field| {
                cell(result.detail.as_ref().and_then(|record| record.text(field)))
            }));

            let owners = result
                .detail
                .as_ref()
                .map(|record| record.owners())
                .unwrap_or_default();
            if owners.is_empty() {
                let mut row = base;
                row.extend(OWNER_COLUMNS.iter().map(|_| PLACEHOLDER.to_string()));
                rows.push(row);
                continue;
            }
            for (n, owner) in owners.iter().enumerate() {
                let mut row = base.clone();
                row.push((n + 1).to_string());
                row.extend(owner_cells(owner));
                rows.push(row);
            }
        }
        rows
    }

    /// Build an all-`Utf8` record batch from the flattened rows.
    pub fn to_record_batch(&self, results: &[ParcelResult]) -> Result<RecordBatch, ExportError> {
        let columns = self.columns();
        let rows = self.rows(results);

        let schema = Arc::new(Schema::new(
            columns
                .iter()
                .map(|name| Field::new(name, DataType::Utf8, false))
                .collect::<Vec<_>>(),
        ));
        let arrays: Vec<ArrayRef> = (0..columns.len())
            .map(|c| {
                let values: Vec<&str> = rows.iter().map(|row| row[c].as_str()).collect();
                Arc::new(StringArray::from(values)) as ArrayRef
            })
            .collect();

        Ok(RecordBatch::try_new(schema, arrays)?)
    }
}

fn cell(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => PLACEHOLDER.to_string(),
    }
}

fn owner_cells(owner: &OwnerRecord) -> impl Iterator<Item = String> + '_ {
    [
        &owner.name,
        &owner.id,
        &owner.address,
        &owner.share,
        &owner.date,
        &owner.reason,
    ]
    .into_iter()
    .map(|v| cell(Some(v.clone())))
}
