pub mod category;
pub mod error;
pub mod geo;
pub mod identifier;
pub mod parcel;
pub mod record;

pub use category::{
    CategoryGroup, CategoryId, CategoryInfo, CategorySet, FloorDataPolicy, PayloadShape,
};
pub use error::CoreError;
pub use geo::{BoundingBox, LatLng, Polygon, PolygonDraft};
pub use identifier::{DecodedIdentifier, decode};
pub use parcel::{Credential, OwnerRecord, ParcelRef, ParcelResult, ParcelStatus};
pub use record::NormalizedRecord;
