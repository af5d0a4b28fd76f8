//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leadflow_campaign::CampaignError;
use leadflow_core::LeadflowError;

/// Any failure a handler can surface, rendered as `{"ok": false, "error": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] LeadflowError),

    #[error(transparent)]
    Campaign(#[from] CampaignError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(LeadflowError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Store(LeadflowError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Campaign(e) if e.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Campaign(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("❌ {self}");
        } else {
            tracing::debug!("Request rejected ({status}): {self}");
        }
        (
            status,
            Json(serde_json::json!({"ok": false, "error": self.to_string()})),
        )
            .into_response()
    }
}
