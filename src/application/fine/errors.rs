use crate::domain::SettlementError;
use thiserror::Error;

/// 罰金管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum FineApplicationError {
    /// 会員が存在しない
    #[error("Member not found")]
    MemberNotFound,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 貸出の状態が不正（例: 返却済みの貸出を再度返却）
    #[error("Invalid loan state: {0}")]
    InvalidLoanState(String),

    /// 支払いが精算ルールに反している
    #[error("Payment rejected: {0}")]
    PaymentRejected(SettlementError),

    /// 精算中に別の支払いで対象の罰金が支払済みになった
    #[error("Fine was settled by a concurrent payment")]
    SettlementConflict,

    /// LoanRepositoryのエラー
    #[error("Loan repository error")]
    LoanRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// MemberServiceのエラー
    #[error("Member service error")]
    MemberServiceError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, FineApplicationError>;
