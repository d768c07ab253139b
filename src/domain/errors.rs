use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// 貸出記録の生成エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoanError {
    /// 返却期限が貸出日より前
    DueBeforeIssue {
        issue_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    },
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 既に返却済み
    AlreadyReturned,
}

/// 罰金ポリシーの設定エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinePolicyError {
    /// 1日あたりの罰金額が負
    NegativeRate,
    /// 1冊あたりの上限額が負
    NegativeCap,
}

/// 精算のエラー
///
/// いずれの場合も貸出の fine_paid は変更されない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    /// 支払額が0以下
    InvalidAmount,
    /// 対象の貸出が存在しない
    LoanNotFound,
    /// 対象の貸出が別の会員のもの
    NotMembersLoan,
    /// 既に支払済み
    AlreadyPaid,
    /// 支払うべき罰金がない
    NothingOwed,
    /// 支払額が罰金額に満たない
    InsufficientAmount { owed: Decimal, paid: Decimal },
    /// 支払額が罰金額を超えている
    Overpayment { owed: Decimal, paid: Decimal },
}

impl std::fmt::Display for SettlementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementError::InvalidAmount => write!(f, "Payment amount must be positive"),
            SettlementError::LoanNotFound => write!(f, "Loan not found"),
            SettlementError::NotMembersLoan => write!(f, "Loan does not belong to member"),
            SettlementError::AlreadyPaid => write!(f, "Fine is already paid"),
            SettlementError::NothingOwed => write!(f, "No fine is owed"),
            SettlementError::InsufficientAmount { owed, paid } => {
                write!(f, "Payment of {} is less than the owed {}", paid, owed)
            }
            SettlementError::Overpayment { owed, paid } => {
                write!(f, "Payment of {} exceeds the owed {}", paid, owed)
            }
        }
    }
}
