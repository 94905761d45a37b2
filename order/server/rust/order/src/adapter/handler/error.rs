use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ErrorResponse;
use crate::domain::entity::dataset::DatasetError;
use crate::usecase::{GetImportJobError, ImportError, RegenerateStampError};

/// OrderError は注文 API のエラー型。
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("import job not found: {0}")]
    JobNotFound(String),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("import failed: {message}")]
    ImportFailed {
        message: String,
        details: Vec<String>,
    },

    #[error("stamp generation failed: {0}")]
    StampGeneration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            OrderError::Validation(_) => (StatusCode::BAD_REQUEST, "SVC_ORDER_VALIDATION_ERROR"),
            OrderError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "SVC_ORDER_PAYLOAD_TOO_LARGE")
            }
            OrderError::JobNotFound(_) => {
                (StatusCode::NOT_FOUND, "SVC_ORDER_IMPORT_JOB_NOT_FOUND")
            }
            OrderError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "SVC_ORDER_NOT_FOUND"),
            OrderError::ImportFailed { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SVC_ORDER_IMPORT_FAILED")
            }
            OrderError::StampGeneration(_) => {
                (StatusCode::BAD_GATEWAY, "SVC_ORDER_STAMP_GENERATION_FAILED")
            }
            OrderError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SVC_ORDER_INTERNAL_ERROR")
            }
        };

        let message = self.to_string();
        let body = match self {
            OrderError::ImportFailed { details, .. } => {
                ErrorResponse::new(code, &message).with_details(details)
            }
            _ => ErrorResponse::new(code, &message),
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatasetError> for OrderError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::UnsupportedExtension(_) | DatasetError::Empty => {
                OrderError::Validation(err.to_string())
            }
            DatasetError::MissingColumns(ref columns) => OrderError::ImportFailed {
                message: err.to_string(),
                details: columns.clone(),
            },
            other => OrderError::ImportFailed {
                message: other.to_string(),
                details: vec![],
            },
        }
    }
}

impl From<ImportError> for OrderError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Dataset(e) => e.into(),
            ImportError::Internal(msg) => OrderError::Internal(msg),
        }
    }
}

impl From<GetImportJobError> for OrderError {
    fn from(err: GetImportJobError) -> Self {
        match err {
            GetImportJobError::NotFound(id) => OrderError::JobNotFound(id),
            GetImportJobError::Internal(e) => OrderError::Internal(e.to_string()),
        }
    }
}

impl From<RegenerateStampError> for OrderError {
    fn from(err: RegenerateStampError) -> Self {
        match err {
            RegenerateStampError::NotFound(key) => OrderError::OrderNotFound(key.to_string()),
            RegenerateStampError::Render(msg) => OrderError::StampGeneration(msg),
            RegenerateStampError::Internal(e) => OrderError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_error_mapping() {
        assert!(matches!(
            OrderError::from(DatasetError::Empty),
            OrderError::Validation(_)
        ));
        assert!(matches!(
            OrderError::from(DatasetError::UnsupportedExtension("a.pdf".to_string())),
            OrderError::Validation(_)
        ));
        match OrderError::from(DatasetError::MissingColumns(vec!["order_id".to_string()])) {
            OrderError::ImportFailed { details, .. } => assert_eq!(details, vec!["order_id"]),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (OrderError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (OrderError::JobNotFound("x".into()), StatusCode::NOT_FOUND),
            (OrderError::OrderNotFound("x".into()), StatusCode::NOT_FOUND),
            (
                OrderError::StampGeneration("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                OrderError::ImportFailed {
                    message: "x".into(),
                    details: vec![],
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
