use crate::domain::{
    MemberId,
    ledger::FineEntry,
    loan::{Loan, LoanStatus},
};
use chrono::{DateTime, Utc};

use super::errors::{FineApplicationError, Result};
use super::fine_service::{ServiceDependencies, ensure_member_exists};

/// 貸出と、その罰金の内訳
pub type LoanWithFine = (Loan, FineEntry);

fn with_fines(
    loans: Vec<Loan>,
    as_of: DateTime<Utc>,
    deps: &ServiceDependencies,
) -> Vec<LoanWithFine> {
    loans
        .into_iter()
        .map(|loan| {
            let entry = FineEntry::for_loan(&loan, as_of, &deps.fine_policy);
            (loan, entry)
        })
        .collect()
}

/// 貸出一覧を取得する（職員向け）
///
/// 状態を指定した場合はその状態の貸出のみを返す。
/// 支払済みや罰金なしの貸出も含め、各行に罰金の内訳を付ける。
pub async fn list_loans(
    deps: &ServiceDependencies,
    status: Option<LoanStatus>,
    as_of: DateTime<Utc>,
) -> Result<Vec<LoanWithFine>> {
    let loans = deps
        .loan_repository
        .find_all()
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    let loans = match status {
        Some(status) => loans
            .into_iter()
            .filter(|loan| loan.status(as_of) == status)
            .collect(),
        None => loans,
    };

    Ok(with_fines(loans, as_of, deps))
}

/// 会員の貸出一覧を取得する
///
/// 罰金台帳と違い、返却済み・支払済みの貸出も含む。
pub async fn list_member_loans(
    deps: &ServiceDependencies,
    member_id: MemberId,
    as_of: DateTime<Utc>,
) -> Result<Vec<LoanWithFine>> {
    ensure_member_exists(&deps.member_service, member_id).await?;

    let loans = deps
        .loan_repository
        .find_by_member_id(member_id)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    Ok(with_fines(loans, as_of, deps))
}
