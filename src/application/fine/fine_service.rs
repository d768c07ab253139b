use crate::domain::{
    self, BookReturned, LoanId, MemberId, ReturnBookError,
    commands::ReturnBook,
    fine::FinePolicy,
    ledger::{FineEntry, FineLedger},
    loan::Loan,
};
use crate::ports::*;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::errors::{FineApplicationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
///
/// 罰金ポリシーも起動時に一度だけ読み込んでここに保持する。
/// 呼び出し箇所ごとに料率を持つことはしない。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_repository: Arc<dyn LoanRepository>,
    pub member_service: Arc<dyn MemberService>,
    pub fine_policy: FinePolicy,
}

/// 会員の存在を確認するヘルパー関数
///
/// 会員を対象とする参照と精算で共通利用される。
pub(super) async fn ensure_member_exists(
    member_service: &Arc<dyn MemberService>,
    member_id: MemberId,
) -> Result<()> {
    let exists = member_service
        .exists(member_id)
        .await
        .map_err(FineApplicationError::MemberServiceError)?;

    if !exists {
        return Err(FineApplicationError::MemberNotFound);
    }
    Ok(())
}

/// IDで貸出を取得するヘルパー関数
pub(super) async fn load_loan(
    loan_repository: &Arc<dyn LoanRepository>,
    loan_id: LoanId,
) -> Result<Loan> {
    loan_repository
        .get_by_id(loan_id)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?
        .ok_or(FineApplicationError::LoanNotFound)
}

/// 会員の罰金台帳を取得する
///
/// 罰金は保存されていないため、毎回貸出記録から導出する。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `member_id` - 会員ID
/// * `as_of` - 罰金計算の基準時刻（未返却の貸出に適用）
pub async fn get_member_ledger(
    deps: &ServiceDependencies,
    member_id: MemberId,
    as_of: DateTime<Utc>,
) -> Result<FineLedger> {
    ensure_member_exists(&deps.member_service, member_id).await?;

    let loans = deps
        .loan_repository
        .find_by_member_id(member_id)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    Ok(FineLedger::build(
        member_id,
        &loans,
        as_of,
        &deps.fine_policy,
    ))
}

/// 1件の貸出の罰金を取得する
///
/// 支払済みの罰金も金額とともに返す（状態は Paid）。
/// 呼び出し側が所有者を確認できるよう、貸出も合わせて返す。
pub async fn get_loan_fine(
    deps: &ServiceDependencies,
    loan_id: LoanId,
    as_of: DateTime<Utc>,
) -> Result<(Loan, FineEntry)> {
    let loan = load_loan(&deps.loan_repository, loan_id).await?;
    let entry = FineEntry::for_loan(&loan, as_of, &deps.fine_policy);
    Ok((loan, entry))
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 既に返却済みでないこと
/// - 延滞していても返却は受け付け、返却時点の罰金額を記録する
///
/// # 並行性
///
/// 保存は return_date のみの条件付き更新で行い、fine_paid は書き戻さない。
/// 返却中に精算が完了しても支払いは失われない。
/// 同時に2件の返却が走った場合は後の方が`InvalidLoanState`になる。
///
/// # 戻り値
/// 返却イベント（返却時点の罰金額を含む）
pub async fn return_book(deps: &ServiceDependencies, cmd: ReturnBook) -> Result<BookReturned> {
    let already_returned =
        || FineApplicationError::InvalidLoanState("Loan is already returned".to_string());

    // 1. 貸出を取得
    let loan = load_loan(&deps.loan_repository, cmd.loan_id).await?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (_, event) = domain::loan::return_book(loan, cmd.returned_at, &deps.fine_policy)
        .map_err(|e| match e {
            ReturnBookError::AlreadyReturned => already_returned(),
        })?;

    // 3. 返却日のみを記録（未返却の場合だけ反映される）
    let applied = deps
        .loan_repository
        .mark_returned(cmd.loan_id, cmd.returned_at)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    if !applied {
        tracing::warn!(
            loan_id = %cmd.loan_id.value(),
            "Return lost a race with a concurrent return"
        );
        return Err(already_returned());
    }

    tracing::info!(
        loan_id = %event.loan_id.value(),
        days_overdue = event.days_overdue,
        fine = %event.fine_assessed,
        "Book returned"
    );

    Ok(event)
}
