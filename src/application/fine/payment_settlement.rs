use crate::domain::{self, FinesSettled, SettlementError, commands::SettlePayment};

use super::errors::{FineApplicationError, Result};
use super::fine_service::{ServiceDependencies, ensure_member_exists};

/// 罰金を精算する
///
/// ビジネスルール：
/// - 会員が存在すること
/// - 指定された貸出は会員自身のものであること（他の会員の貸出は存在しないものとして扱う）
/// - 支払額が対象の罰金額と完全に一致すること（ドメイン層で検証）
/// - 対象の貸出をすべて支払済みにする。部分的な反映はしない
///
/// 支払額の検証はサーバー側で必ず行う。クライアントが表示した金額は信用しない。
///
/// # 並行性
///
/// 検証から更新までの間に別の支払いが同じ罰金を精算した場合、
/// リポジトリの条件付き更新が失敗し`SettlementConflict`を返す。
///
/// # 戻り値
/// 精算イベント（領収書）
pub async fn settle_payment(deps: &ServiceDependencies, cmd: SettlePayment) -> Result<FinesSettled> {
    // 1. 会員の存在確認
    ensure_member_exists(&deps.member_service, cmd.member_id).await?;

    // 2. 会員の貸出を取得
    //    他の会員の貸出は対象に含めない。存在しない貸出と同じく LoanNotFound になる
    let loans = deps
        .loan_repository
        .find_by_member_id(cmd.member_id)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    // 3. ドメイン層の純粋関数で支払いを検証
    let event = domain::ledger::settle_payment(&loans, &cmd, &deps.fine_policy).map_err(|e| {
        tracing::warn!(
            member_id = %cmd.member_id.value(),
            amount = %cmd.amount,
            reason = %e,
            "Payment rejected"
        );
        match e {
            SettlementError::LoanNotFound | SettlementError::NotMembersLoan => {
                FineApplicationError::LoanNotFound
            }
            other => FineApplicationError::PaymentRejected(other),
        }
    })?;

    // 4. 対象の罰金を支払済みにする（全件か0件か）
    let applied = deps
        .loan_repository
        .mark_fines_paid(&event.loan_ids)
        .await
        .map_err(FineApplicationError::LoanRepositoryError)?;

    if !applied {
        tracing::warn!(
            member_id = %cmd.member_id.value(),
            "Settlement lost a race with a concurrent payment"
        );
        return Err(FineApplicationError::SettlementConflict);
    }

    tracing::info!(
        receipt_id = %event.receipt_id.value(),
        member_id = %event.member_id.value(),
        loans = event.loan_ids.len(),
        amount = %event.amount,
        method = event.payment_method.as_str(),
        "Fines settled"
    );

    Ok(event)
}
