use crate::application::fine::FineApplicationError;
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
/// セッションと権限のエラーはAPI層で発生する。
#[derive(Debug)]
pub enum ApiError {
    Application(FineApplicationError),
    Unauthorized(&'static str),
    Forbidden,
    /// リクエストの本文やクエリを解釈できない
    InvalidRequest(String),
}

impl From<FineApplicationError> for ApiError {
    fn from(err: FineApplicationError) -> Self {
        ApiError::Application(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            // 401 / 403 - セッションと権限
            ApiError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", reason.to_string())
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                "Not allowed to access this resource".to_string(),
            ),

            // 400 Bad Request - 本文やクエリの形式が不正
            ApiError::InvalidRequest(message) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST", message)
            }

            // 404 Not Found - リクエストされたリソースが存在しない
            ApiError::Application(FineApplicationError::LoanNotFound) => (
                StatusCode::NOT_FOUND,
                "LOAN_NOT_FOUND",
                "Loan not found".to_string(),
            ),
            ApiError::Application(FineApplicationError::MemberNotFound) => (
                StatusCode::NOT_FOUND,
                "MEMBER_NOT_FOUND",
                "Member not found".to_string(),
            ),

            // 409 Conflict - 同じ罰金への並行した支払い
            ApiError::Application(FineApplicationError::SettlementConflict) => (
                StatusCode::CONFLICT,
                "SETTLEMENT_CONFLICT",
                "Fine was settled by another payment".to_string(),
            ),

            // 422 Unprocessable Entity - ビジネスルール違反
            ApiError::Application(FineApplicationError::PaymentRejected(ref reason)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "PAYMENT_REJECTED",
                reason.to_string(),
            ),
            ApiError::Application(FineApplicationError::InvalidLoanState(ref msg)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_LOAN_STATE",
                msg.clone(),
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ApiError::Application(FineApplicationError::LoanRepositoryError(ref e)) => {
                tracing::error!("Loan repository error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LOAN_REPOSITORY_ERROR",
                    "Failed to access loans".to_string(),
                )
            }
            ApiError::Application(FineApplicationError::MemberServiceError(ref e)) => {
                tracing::error!("Member service error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MEMBER_SERVICE_ERROR",
                    "Member service error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
