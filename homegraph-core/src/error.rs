use std::fmt::{self, Display, Formatter};

use thiserror::Error;

pub const DUPLICATE_ID_MESSAGE: &str = "Device Id already exists";

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("device not found: {0}")]
    NotFound(String),

    #[error("Device Id already exists: {0}")]
    Conflict(String),

    #[error("invalid device: {0}")]
    Invalid(ValidationErrors),

    #[error("device storage failed: {0}")]
    Storage(#[source] anyhow::Error),
}

impl RepositoryError {
    /// Messages suitable for showing next to an edit form.
    pub fn form_errors(&self) -> Vec<String> {
        match self {
            Self::Invalid(errors) => errors.0.clone(),
            Self::Conflict(_) => vec![DUPLICATE_ID_MESSAGE.to_string()],
            other => vec![other.to_string()],
        }
    }
}

/// Validator output wrapped so it can travel inside [`RepositoryError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub Vec<String>);

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("; "))
    }
}
