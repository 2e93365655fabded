//! Per-parcel category aggregation.
//!
//! All categories for one parcel are fetched concurrently, then merged in
//! ascending category order into one [`NormalizedRecord`]:
//!
//! - scalar categories copy their row into the flat namespace;
//! - list categories keep every row under their list key and also copy the
//!   first row into the flat namespace;
//! - a failed fetch counts as an empty payload.
//!
//! If nothing meaningful came back the result is `None`.

use std::sync::Arc;

use futures::future::join_all;
use parcelscope_core::{CategoryId, CategorySet, DecodedIdentifier, FloorDataPolicy, NormalizedRecord};
use tracing::{debug, warn};

use crate::{CategoryPayload, CategorySource};

pub struct CategoryAggregator {
    source: Arc<dyn CategorySource>,
    floor_policy: FloorDataPolicy,
}

impl CategoryAggregator {
    pub fn new(source: Arc<dyn CategorySource>) -> Self {
        Self {
            source,
            floor_policy: FloorDataPolicy::default(),
        }
    }

    pub fn with_floor_policy(mut self, policy: FloorDataPolicy) -> Self {
        self.floor_policy = policy;
        self
    }

    /// Fetch and merge `requested` (plus implied categories) for one parcel.
    ///
    /// Categories without a registry endpoint are skipped.
    pub async fn aggregate(
        &self,
        id: &DecodedIdentifier,
        requested: &CategorySet,
    ) -> Option<NormalizedRecord> {
        let targets: Vec<CategoryId> = requested
            .with_implied()
            .iter()
            .filter(|c| c.info().operation.is_some())
            .collect();

        let fetches = targets.iter().map(|&category| async move {
            let payload = match self.source.fetch(id, category).await {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(parcel = %id, category = %category, error = %e, "category fetch failed");
                    CategoryPayload::Empty
                }
            };
            (category, payload)
        });
        let payloads = join_all(fetches).await;

        merge_payloads(&payloads, self.floor_policy)
    }
}

/// Merge category payloads into one record; `None` if none carried data.
pub fn merge_payloads(
    payloads: &[(CategoryId, CategoryPayload)],
    floor_policy: FloorDataPolicy,
) -> Option<NormalizedRecord> {
    let mut record = NormalizedRecord::new();
    let mut has_data = false;

    for (category, payload) in payloads {
        match payload {
            CategoryPayload::Empty => {}
            CategoryPayload::Scalar(row) => {
                record.merge_flat(row);
                has_data = true;
            }
            CategoryPayload::List(rows) => {
                if let Some(key) = category.info().list_key {
                    record.insert_rows(key, rows);
                }
                if let Some(first) = rows.first() {
                    record.merge_flat(first);
                }
                has_data |= match category {
                    CategoryId::FloorOutline => floor_policy.is_meaningful(rows),
                    _ => true,
                };
            }
        }
    }

    debug!(fields = record.len(), has_data, "category payloads merged");
    has_data.then_some(record)
}
