use homegraph_core::error::RepositoryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error("attribute '{key}' declared with conflicting values by traits of device '{device}'")]
    AttributeCollision { device: String, key: String },

    #[error("malformed fulfillment request: {0}")]
    Protocol(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
