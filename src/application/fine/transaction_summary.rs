use crate::domain::ledger::TransactionSummary;
use chrono::{DateTime, Utc};

use super::errors::{FineApplicationError, Result};
use super::fine_service::ServiceDependencies;

/// 貸出全体を集計する（職員向け）
///
/// 総貸出数、貸出中、延滞中、罰金の合計（支払済みを含む）と未払い合計を返す。
pub async fn summarize_transactions(
    deps: &ServiceDependencies,
    as_of: DateTime<Utc>,
) -> Result<TransactionSummary> {
    let loans = deps
        .loan_repository
        .find_all()
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    Ok(TransactionSummary::from_loans(
        &loans,
        as_of,
        &deps.fine_policy,
    ))
}
