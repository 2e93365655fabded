use parcelscope_core::CategoryId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry returned result code {code}: {message}")]
    Upstream { code: String, message: String },

    #[error("category {0} has no registry endpoint")]
    NoEndpoint(CategoryId),

    #[error("owner backend rejected the request: {0}")]
    OwnerRejected(String),

    #[error("owner lookup attempted without a captured credential")]
    MissingCredential,
}
