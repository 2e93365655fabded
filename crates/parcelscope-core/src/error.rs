use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown registry category id: {0}")]
    UnknownCategory(u8),

    #[error("invalid category list {0:?}")]
    InvalidCategoryList(String),

    #[error("no registry category selected")]
    EmptySelection,

    #[error("polygon needs at least 3 vertices, got {0}")]
    TooFewVertices(usize),
}
