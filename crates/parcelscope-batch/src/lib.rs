//! Batch runner: drives category aggregation and owner enrichment across
//! every resolved parcel, strictly one parcel at a time.
//!
//! A run is a lazy, finite [`Stream`] of [`BatchProgress`] snapshots, one per
//! finished parcel. Each snapshot carries the full result list, so a consumer
//! can render partial progress without waiting for the whole batch. Record
//! payloads are `Arc`-shared, which keeps a snapshot to one `Vec` of handles.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, stream};
use parcelscope_core::parcel::{REASON_IDENTIFIER, REASON_NO_DATA};
use parcelscope_core::{
    CategorySet, CoreError, Credential, NormalizedRecord, ParcelRef, ParcelResult, ParcelStatus,
    decode,
};
use parcelscope_registry::{CategoryAggregator, OwnerEnricher};
use tracing::{debug, info, warn};

/// What to fetch for every parcel of a batch.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    categories: CategorySet,
    credential: Option<Credential>,
}

impl BatchRequest {
    /// Fails on an empty category selection.
    pub fn new(categories: CategorySet) -> Result<Self, CoreError> {
        Ok(Self {
            categories: categories.require_non_empty()?,
            credential: None,
        })
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn categories(&self) -> &CategorySet {
        &self.categories
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Snapshot published after each parcel reaches a terminal status.
#[derive(Debug, Clone)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: u8,
    pub at: DateTime<Utc>,
    pub results: Vec<ParcelResult>,
}

impl BatchProgress {
    /// The parcel that just finished.
    pub fn latest(&self) -> Option<&ParcelResult> {
        self.completed
            .checked_sub(1)
            .and_then(|i| self.results.get(i))
    }
}

/// Final outcome of a batch.
#[derive(Debug)]
pub struct BatchSummary {
    pub results: Vec<ParcelResult>,
    pub done: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// Integer percentage of `completed` over `total`; an empty batch is 100%.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((completed as f64 * 100.0 / total as f64).round() as u64).min(100) as u8
}

struct RunState {
    results: Vec<ParcelResult>,
    next: usize,
}

type OwnerLookup<'a> = Option<(&'a OwnerEnricher, &'a Credential)>;

pub struct BatchRunner {
    aggregator: CategoryAggregator,
    enricher: Option<OwnerEnricher>,
}

impl BatchRunner {
    pub fn new(aggregator: CategoryAggregator) -> Self {
        Self {
            aggregator,
            enricher: None,
        }
    }

    pub fn with_owner_enricher(mut self, enricher: OwnerEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Process `parcels` in order, yielding a snapshot after each one.
    ///
    /// Parcel N+1 is not started until parcel N is `done` or `fail`. There is
    /// no cancellation beyond dropping the stream.
    pub fn run<'a>(
        &'a self,
        parcels: Vec<ParcelRef>,
        request: &'a BatchRequest,
    ) -> impl Stream<Item = BatchProgress> + 'a {
        let owner = self.owner_lookup(request);
        info!(
            total = parcels.len(),
            categories = %request.categories(),
            owner_lookup = owner.is_some(),
            "batch starting"
        );

        let state = RunState {
            results: parcels.into_iter().map(ParcelResult::ready).collect(),
            next: 0,
        };

        stream::unfold(state, move |mut state| async move {
            let slot = state.results.get_mut(state.next)?;
            self.process(slot, request.categories(), owner).await;
            debug!(
                pnu = %slot.parcel.identifier,
                status = slot.status.as_str(),
                reason = %slot.reason,
                "parcel finished"
            );
            state.next += 1;

            let total = state.results.len();
            let progress = BatchProgress {
                completed: state.next,
                total,
                percent: percent(state.next, total),
                at: Utc::now(),
                results: state.results.clone(),
            };
            Some((progress, state))
        })
    }

    /// Drive [`run`](Self::run) to completion, handing each snapshot to
    /// `on_progress`.
    pub async fn run_to_end(
        &self,
        parcels: Vec<ParcelRef>,
        request: &BatchRequest,
        mut on_progress: impl FnMut(&BatchProgress),
    ) -> BatchSummary {
        let start = Instant::now();
        let mut results: Vec<ParcelResult> = parcels.iter().cloned().map(ParcelResult::ready).collect();

        let mut progress = std::pin::pin!(self.run(parcels, request));
        while let Some(snapshot) = progress.next().await {
            on_progress(&snapshot);
            results = snapshot.results;
        }

        let done = results
            .iter()
            .filter(|r| r.status == ParcelStatus::Done)
            .count();
        let failed = results
            .iter()
            .filter(|r| r.status == ParcelStatus::Fail)
            .count();
        let elapsed = start.elapsed();
        info!(done, failed, elapsed_ms = elapsed.as_millis() as u64, "batch complete");

        BatchSummary {
            results,
            done,
            failed,
            elapsed,
        }
    }

    fn owner_lookup<'a>(&'a self, request: &'a BatchRequest) -> OwnerLookup<'a> {
        if !request.categories().wants_owner() {
            return None;
        }
        match (&self.enricher, request.credential()) {
            (Some(enricher), Some(credential)) => Some((enricher, credential)),
            (None, _) => {
                warn!("owner records requested but no owner backend configured; skipping");
                None
            }
            (_, None) => {
                warn!("owner records requested without a captured credential; skipping");
                None
            }
        }
    }

    async fn process(&self, result: &mut ParcelResult, categories: &CategorySet, owner: OwnerLookup<'_>) {
        let Some(id) = decode(&result.parcel.identifier) else {
            warn!(pnu = %result.parcel.identifier, "cannot decode parcel identifier");
            result.mark_failed(REASON_IDENTIFIER);
            return;
        };

        let registry = categories.registry_only();
        let mut record = if registry.is_empty() {
            NormalizedRecord::new()
        } else {
            self.aggregator
                .aggregate(&id, &registry)
                .await
                .unwrap_or_default()
        };

        if let Some((enricher, credential)) = owner {
            enricher
                .enrich(&mut record, &result.parcel.address, credential)
                .await;
        }

        if record.is_empty() {
            result.mark_failed(REASON_NO_DATA);
        } else {
            result.mark_done(record);
        }
    }
}
