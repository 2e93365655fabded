//! Parcel references, per-parcel results and owner-backend types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::NormalizedRecord;

/// Failure reason for identifiers that cannot be decoded.
pub const REASON_IDENTIFIER: &str = "identifier error";
/// Failure reason for parcels with no merged fields.
pub const REASON_NO_DATA: &str = "no data";

/// A parcel resolved from the geometry service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelRef {
    pub identifier: String,
    pub address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParcelStatus {
    Ready,
    Done,
    Fail,
}

impl ParcelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Done => "done",
            Self::Fail => "fail",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Ready)
    }
}

/// Batch state for one parcel.
///
/// Created `ready`; moved once to `done` or `fail` and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelResult {
    #[serde(flatten)]
    pub parcel: ParcelRef,
    pub detail: Option<Arc<NormalizedRecord>>,
    pub status: ParcelStatus,
    pub reason: String,
}

impl ParcelResult {
    pub fn ready(parcel: ParcelRef) -> Self {
        Self {
            parcel,
            detail: None,
            status: ParcelStatus::Ready,
            reason: String::new(),
        }
    }

    /// Move to `done` with `record`. No-op (returns false) once terminal.
    pub fn mark_done(&mut self, record: NormalizedRecord) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(pnu = %self.parcel.identifier, "ignoring second completion");
            return false;
        }
        self.detail = Some(Arc::new(record));
        self.status = ParcelStatus::Done;
        self.reason.clear();
        true
    }

    /// Move to `fail` with `reason`. No-op (returns false) once terminal.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> bool {
        if self.status.is_terminal() {
            tracing::warn!(pnu = %self.parcel.identifier, "ignoring second completion");
            return false;
        }
        self.detail = None;
        self.status = ParcelStatus::Fail;
        self.reason = reason.into();
        true
    }
}

/// One owner row returned by the owner backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OwnerRecord {
    pub name: String,
    pub id: String,
    pub address: String,
    pub share: String,
    pub date: String,
    pub reason: String,
}

/// Operator credential for the owner backend, held in memory only.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub id: String,
    pub pw: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, pw: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pw: pw.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.id.trim().is_empty() && !self.pw.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("pw", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parcel() -> ParcelRef {
        ParcelRef {
            identifier: "4113510300104150023".into(),
            address: "경기도 성남시 분당구 정자동 415-23".into(),
        }
    }

    #[test]
    fn done_is_final() {
        let mut r = ParcelResult::ready(parcel());
        let mut rec = NormalizedRecord::new();
        rec.insert("bldNm", json!("A"));
        assert!(r.mark_done(rec));
        assert!(!r.mark_failed(REASON_NO_DATA));
        assert_eq!(r.status, ParcelStatus::Done);
        assert!(r.reason.is_empty());
        assert!(r.detail.is_some());
    }

    #[test]
    fn fail_is_final() {
        let mut r = ParcelResult::ready(parcel());
        assert!(r.mark_failed(REASON_IDENTIFIER));
        assert!(!r.mark_done(NormalizedRecord::new()));
        assert_eq!(r.status, ParcelStatus::Fail);
        assert_eq!(r.reason, "identifier error");
        assert!(r.detail.is_none());
    }

    #[test]
    fn result_serializes_flat() {
        let r = ParcelResult::ready(parcel());
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["identifier"], "4113510300104150023");
        assert_eq!(v["status"], "ready");
        assert!(v["detail"].is_null());
    }

    #[test]
    fn owner_record_tolerates_missing_fields() {
        let o: OwnerRecord = serde_json::from_str(r#"{"name":"Lee","share":"1/1"}"#).unwrap();
        assert_eq!(o.name, "Lee");
        assert!(o.date.is_empty());
    }

    #[test]
    fn credential_debug_hides_password() {
        let c = Credential::new("operator", "s3cret");
        let dbg = format!("{c:?}");
        assert!(dbg.contains("operator"));
        assert!(!dbg.contains("s3cret"));
        assert!(c.is_complete());
        assert!(!Credential::new("", "x").is_complete());
    }
}
