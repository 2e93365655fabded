//! Registry layer: geometry lookup, building-registry category fetches, owner
//! enrichment, and the per-parcel merge of category payloads.

pub mod aggregate;
pub mod building;
pub mod config;
pub mod error;
pub mod geometry;
pub mod owner;

pub use aggregate::{CategoryAggregator, merge_payloads};
pub use building::{BuildingRegistryClient, CategoryPayload, CategorySource};
pub use config::{DEFAULT_LOCALITY, GeometryConfig, OwnerConfig, RegistryConfig, ServiceConfig};
pub use error::RegistryError;
pub use geometry::ParcelLocator;
pub use owner::{OwnerClient, OwnerEnricher, OwnerSource};
