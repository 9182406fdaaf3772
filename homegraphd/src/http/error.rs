use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use homegraph_core::error::RepositoryError;

/// Repository failures rendered as JSON with an `errors` list for form display.
pub struct ApiError(pub RepositoryError);

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
            RepositoryError::Conflict(_) | RepositoryError::Invalid(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            RepositoryError::Storage(e) => {
                tracing::error!(error = %e, "device catalog write failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(serde_json::json!({ "errors": self.0.form_errors() }));
        (status, body).into_response()
    }
}
