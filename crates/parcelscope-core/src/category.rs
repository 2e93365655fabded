//! Building-registry category catalog.
//!
//! Each registry category is served by its own endpoint operation and returns
//! either at most one row per parcel (scalar) or many rows (list). Owner
//! records are category 11 but come from the owner backend, not the registry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

/// Registry category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum CategoryId {
    BasicOutline = 1,
    SummaryHeader = 2,
    TitleSection = 3,
    FloorOutline = 4,
    AttachedLots = 5,
    ExclusiveCommonArea = 6,
    Wastewater = 7,
    AssessedPrice = 8,
    ExclusiveSection = 9,
    Zoning = 10,
    OwnerRecords = 11,
}

/// Whether an endpoint yields one row or many rows per parcel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Scalar,
    List,
}

/// Display grouping for category pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CategoryGroup {
    Building,
    Units,
    Land,
    Facilities,
    Owners,
}

impl CategoryGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Building => "building",
            Self::Units => "units",
            Self::Land => "land",
            Self::Facilities => "facilities",
            Self::Owners => "owners",
        }
    }
}

/// Static metadata for one category.
#[derive(Debug)]
pub struct CategoryInfo {
    pub id: CategoryId,
    pub label: &'static str,
    pub group: CategoryGroup,
    /// Registry operation name; `None` for categories served elsewhere.
    pub operation: Option<&'static str>,
    pub shape: PayloadShape,
    /// Record key under which list rows are retained verbatim.
    pub list_key: Option<&'static str>,
    pub default_checked: bool,
}

static CATALOG: [CategoryInfo; 11] = [
    CategoryInfo {
        id: CategoryId::BasicOutline,
        label: "Basic outline",
        group: CategoryGroup::Building,
        operation: Some("getBrBasisOulnInfo"),
        shape: PayloadShape::Scalar,
        list_key: None,
        default_checked: true,
    },
    CategoryInfo {
        id: CategoryId::SummaryHeader,
        label: "Summary header",
        group: CategoryGroup::Building,
        operation: Some("getBrRecapTitleInfo"),
        shape: PayloadShape::Scalar,
        list_key: None,
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::TitleSection,
        label: "Title section",
        group: CategoryGroup::Building,
        operation: Some("getBrTitleInfo"),
        shape: PayloadShape::Scalar,
        list_key: None,
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::FloorOutline,
        label: "Per-floor outline",
        group: CategoryGroup::Building,
        operation: Some("getBrFlrOulnInfo"),
        shape: PayloadShape::List,
        list_key: Some("floorDetails"),
        default_checked: true,
    },
    CategoryInfo {
        id: CategoryId::AttachedLots,
        label: "Attached-lot numbers",
        group: CategoryGroup::Land,
        operation: Some("getBrAtchJibunInfo"),
        shape: PayloadShape::List,
        list_key: Some("attachedLots"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::ExclusiveCommonArea,
        label: "Exclusive/common area",
        group: CategoryGroup::Units,
        operation: Some("getBrExposPubuseAreaInfo"),
        shape: PayloadShape::List,
        list_key: Some("exclusiveCommonAreas"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::Wastewater,
        label: "Wastewater facility",
        group: CategoryGroup::Facilities,
        operation: Some("getBrWclfInfo"),
        shape: PayloadShape::List,
        list_key: Some("wastewaterFacilities"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::AssessedPrice,
        label: "Assessed price",
        group: CategoryGroup::Land,
        operation: Some("getBrHsprcInfo"),
        shape: PayloadShape::List,
        list_key: Some("assessedPrices"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::ExclusiveSection,
        label: "Exclusive section",
        group: CategoryGroup::Units,
        operation: Some("getBrExposInfo"),
        shape: PayloadShape::List,
        list_key: Some("exclusiveSections"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::Zoning,
        label: "Zoning",
        group: CategoryGroup::Land,
        operation: Some("getBrJijiguInfo"),
        shape: PayloadShape::List,
        list_key: Some("zoningDistricts"),
        default_checked: false,
    },
    CategoryInfo {
        id: CategoryId::OwnerRecords,
        label: "Owner records",
        group: CategoryGroup::Owners,
        operation: None,
        shape: PayloadShape::List,
        list_key: Some(CategoryId::OWNER_KEY),
        default_checked: false,
    },
];

impl CategoryId {
    pub const ALL: [CategoryId; 11] = [
        Self::BasicOutline,
        Self::SummaryHeader,
        Self::TitleSection,
        Self::FloorOutline,
        Self::AttachedLots,
        Self::ExclusiveCommonArea,
        Self::Wastewater,
        Self::AssessedPrice,
        Self::ExclusiveSection,
        Self::Zoning,
        Self::OwnerRecords,
    ];

    /// Record key holding the owner list.
    pub const OWNER_KEY: &'static str = "ownerInfo";

    pub fn info(self) -> &'static CategoryInfo {
        &CATALOG[self as usize - 1]
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    pub fn shape(self) -> PayloadShape {
        self.info().shape
    }

    pub fn is_owner(self) -> bool {
        self == Self::OwnerRecords
    }
}

impl From<CategoryId> for u8 {
    fn from(id: CategoryId) -> u8 {
        id as u8
    }
}

impl TryFrom<u8> for CategoryId {
    type Error = CoreError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=11 => Ok(Self::ALL[value as usize - 1]),
            other => Err(CoreError::UnknownCategory(other)),
        }
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Categories grouped for display, built once.
pub fn grouped() -> &'static BTreeMap<CategoryGroup, Vec<CategoryId>> {
    static GROUPED: OnceLock<BTreeMap<CategoryGroup, Vec<CategoryId>>> = OnceLock::new();
    GROUPED.get_or_init(|| {
        let mut map: BTreeMap<CategoryGroup, Vec<CategoryId>> = BTreeMap::new();
        for info in &CATALOG {
            map.entry(info.group).or_default().push(info.id);
        }
        map
    })
}

/// An ordered set of requested categories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySet(BTreeSet<CategoryId>);

impl CategorySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The default-checked selection.
    pub fn defaults() -> Self {
        CATALOG
            .iter()
            .filter(|info| info.default_checked)
            .map(|info| info.id)
            .collect()
    }

    pub fn insert(&mut self, id: CategoryId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = CategoryId> + '_ {
        self.0.iter().copied()
    }

    pub fn wants_owner(&self) -> bool {
        self.contains(CategoryId::OwnerRecords)
    }

    /// Registry-served categories only (owner records removed).
    pub fn registry_only(&self) -> Self {
        self.iter().filter(|id| !id.is_owner()).collect()
    }

    /// Add the title section whenever the basic outline is requested; the
    /// outline endpoint omits fields only the title section carries.
    pub fn with_implied(&self) -> Self {
        let mut out = self.clone();
        if out.contains(CategoryId::BasicOutline) {
            out.insert(CategoryId::TitleSection);
        }
        out
    }

    /// Fail on an empty selection.
    pub fn require_non_empty(self) -> Result<Self, CoreError> {
        if self.is_empty() {
            return Err(CoreError::EmptySelection);
        }
        Ok(self)
    }
}

impl FromIterator<CategoryId> for CategorySet {
    fn from_iter<I: IntoIterator<Item = CategoryId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for CategorySet {
    type Err = CoreError;

    /// Parse a comma-separated id list such as `"1,4,11"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let n: u8 = part
                .parse()
                .map_err(|_| CoreError::InvalidCategoryList(s.to_string()))?;
            set.insert(CategoryId::try_from(n)?);
        }
        Ok(set)
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.iter().map(|id| id.to_string()).collect();
        write!(f, "{}", ids.join(","))
    }
}

/// Decides whether per-floor rows carry meaningful data.
///
/// The registry happily returns floor rows with zero area for parcels that
/// have no building on record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FloorDataPolicy {
    /// At least one floor's `area` parses to a positive number.
    #[default]
    AnyPositiveArea,
    /// Any floor row at all.
    AnyRow,
}

/// Floor-row field holding the floor area.
pub const FLOOR_AREA_FIELD: &str = "area";

impl FloorDataPolicy {
    pub fn is_meaningful(&self, floors: &[Map<String, Value>]) -> bool {
        match self {
            Self::AnyRow => !floors.is_empty(),
            Self::AnyPositiveArea => floors
                .iter()
                .filter_map(|row| row.get(FLOOR_AREA_FIELD))
                .filter_map(parse_number)
                .any(|area| area > 0.0),
        }
    }
}

/// Registry values arrive as JSON numbers or numeric strings.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
