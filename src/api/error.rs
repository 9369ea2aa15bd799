use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::domain::error::WalletError;

// Error unificado para la API: envuelve el error de dominio y decide el
// código HTTP en un único lugar.
pub struct ApiError(pub WalletError);

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self.0 {
            WalletError::InvalidAmount(_)
            | WalletError::InvalidInput(_)
            | WalletError::WalletInactive(_)
            | WalletError::InsufficientBalance(_)
            | WalletError::RequestMissing(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            WalletError::AccountNotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            WalletError::PermissionDenied => (StatusCode::FORBIDDEN, self.0.to_string()),
            WalletError::LockBusy(_)
            | WalletError::Conflict(_)
            | WalletError::Concurrency(_) => (StatusCode::CONFLICT, self.0.to_string()),
            WalletError::TransferFailed(ref cause) => {
                tracing::error!("Transfer failed: {}", cause);
                (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string())
            }
            WalletError::RepositoryError(ref e) => {
                tracing::error!("Repository error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "status": "error",
            "message": error_message,
        }));

        (status, body).into_response()
    }
}
