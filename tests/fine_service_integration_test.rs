use async_trait::async_trait;
use chrono::{DateTime, Utc};
use library_fines::application::fine::{
    FineApplicationError, ServiceDependencies, get_loan_fine, get_member_ledger, list_loans,
    list_member_loans, return_book, settle_payment, summarize_transactions,
};
use library_fines::domain::{
    LoanId, MemberId, PaymentMethod, SettlementError,
    commands::{ReturnBook, SettlePayment},
    ledger::FineStatus,
    loan::{Loan, LoanStatus},
};
use library_fines::ports::LoanRepository;
use library_fines::ports::loan_repository::Result as RepositoryResult;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

mod common;
use common::*;

fn payment(member_id: MemberId, loan_id: Option<LoanId>, amount: Decimal) -> SettlePayment {
    SettlePayment {
        member_id,
        loan_id,
        amount,
        payment_method: PaymentMethod::Upi,
        requested_at: date(2024, 1, 20),
    }
}

async fn fine_paid(repository: &dyn LoanRepository, loan_id: LoanId) -> bool {
    repository
        .get_by_id(loan_id)
        .await
        .unwrap()
        .unwrap()
        .fine_paid
}

// ============================================================================
// 台帳の参照
// ============================================================================

#[tokio::test]
async fn test_ledger_lists_only_unpaid_fines() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let overdue = unreturned_long_overdue(member_id);
    let (deps, _) = setup_deps(
        &[member_id],
        vec![
            late.clone(),
            overdue.clone(),
            returned_on_time(member_id),
            paid_late_return(member_id),
            returned_three_days_late(MemberId::new()),
        ],
    );

    let ledger = get_member_ledger(&deps, member_id, date(2024, 1, 20))
        .await
        .unwrap();

    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.entry(late.loan_id).unwrap().amount, dec!(6));
    assert_eq!(ledger.entry(overdue.loan_id).unwrap().amount, dec!(10));
    assert_eq!(ledger.total, dec!(16));
    assert!(!ledger.can_borrow());
}

#[tokio::test]
async fn test_ledger_for_member_without_fines_allows_borrowing() {
    let member_id = MemberId::new();
    let (deps, _) = setup_deps(&[member_id], vec![returned_on_time(member_id)]);

    let ledger = get_member_ledger(&deps, member_id, date(2024, 1, 20))
        .await
        .unwrap();

    assert!(ledger.entries.is_empty());
    assert_eq!(ledger.total, Decimal::ZERO);
    assert!(ledger.can_borrow());
}

#[tokio::test]
async fn test_ledger_for_unknown_member_fails() {
    let (deps, _) = setup_deps(&[], vec![]);

    let result = get_member_ledger(&deps, MemberId::new(), date(2024, 1, 20)).await;

    assert!(matches!(result, Err(FineApplicationError::MemberNotFound)));
}

#[tokio::test]
async fn test_loan_fine_reports_paid_status() {
    let member_id = MemberId::new();
    let paid = paid_late_return(member_id);
    let (deps, _) = setup_deps(&[member_id], vec![paid.clone()]);

    let (loan, entry) = get_loan_fine(&deps, paid.loan_id, date(2024, 1, 20))
        .await
        .unwrap();

    assert_eq!(loan.member_id, member_id);
    assert_eq!(entry.status, FineStatus::Paid);
    assert_eq!(entry.amount, dec!(10));
}

#[tokio::test]
async fn test_loan_fine_for_unknown_loan_fails() {
    let (deps, _) = setup_deps(&[], vec![]);

    let result = get_loan_fine(&deps, LoanId::new(), date(2024, 1, 20)).await;

    assert!(matches!(result, Err(FineApplicationError::LoanNotFound)));
}

// ============================================================================
// 精算
// ============================================================================

#[tokio::test]
async fn test_settle_single_fine_with_exact_amount() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let overdue = unreturned_long_overdue(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![late.clone(), overdue.clone()]);

    let receipt = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(6.00)))
        .await
        .unwrap();

    assert_eq!(receipt.loan_ids, vec![late.loan_id]);
    assert_eq!(receipt.amount, dec!(6));
    assert_eq!(receipt.payment_method, PaymentMethod::Upi);
    assert!(fine_paid(repository.as_ref(), late.loan_id).await);
    assert!(!fine_paid(repository.as_ref(), overdue.loan_id).await);

    // 支払った分だけ台帳の合計が減る
    let ledger = get_member_ledger(&deps, member_id, date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(ledger.total, dec!(10));
}

#[tokio::test]
async fn test_insufficient_payment_leaves_fine_unpaid() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![late.clone()]);

    let result = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(5.99))).await;

    match result {
        Err(FineApplicationError::PaymentRejected(SettlementError::InsufficientAmount {
            owed,
            paid,
        })) => {
            assert_eq!(owed, dec!(6));
            assert_eq!(paid, dec!(5.99));
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!fine_paid(repository.as_ref(), late.loan_id).await);
}

#[tokio::test]
async fn test_overpayment_rejected() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![late.clone()]);

    let result = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(7))).await;

    assert!(matches!(
        result,
        Err(FineApplicationError::PaymentRejected(
            SettlementError::Overpayment { .. }
        ))
    ));
    assert!(!fine_paid(repository.as_ref(), late.loan_id).await);
}

#[tokio::test]
async fn test_pay_all_settles_every_unpaid_fine() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let overdue = unreturned_long_overdue(member_id);
    let on_time = returned_on_time(member_id);
    let (deps, repository) = setup_deps(
        &[member_id],
        vec![late.clone(), overdue.clone(), on_time.clone()],
    );

    let receipt = settle_payment(&deps, payment(member_id, None, dec!(16)))
        .await
        .unwrap();

    assert_eq!(receipt.loan_ids.len(), 2);
    assert!(fine_paid(repository.as_ref(), late.loan_id).await);
    assert!(fine_paid(repository.as_ref(), overdue.loan_id).await);
    assert!(!fine_paid(repository.as_ref(), on_time.loan_id).await);

    let ledger = get_member_ledger(&deps, member_id, date(2024, 1, 20))
        .await
        .unwrap();
    assert!(ledger.can_borrow());
}

#[tokio::test]
async fn test_pay_all_with_nothing_owed_rejected() {
    let member_id = MemberId::new();
    let (deps, _) = setup_deps(&[member_id], vec![returned_on_time(member_id)]);

    let result = settle_payment(&deps, payment(member_id, None, dec!(1))).await;

    assert!(matches!(
        result,
        Err(FineApplicationError::PaymentRejected(
            SettlementError::NothingOwed
        ))
    ));
}

#[tokio::test]
async fn test_paying_another_members_loan_looks_like_unknown_loan() {
    let member_id = MemberId::new();
    let other_member = MemberId::new();
    let others_loan = returned_three_days_late(other_member);
    let (deps, repository) = setup_deps(&[member_id, other_member], vec![others_loan.clone()]);

    let result = settle_payment(
        &deps,
        payment(member_id, Some(others_loan.loan_id), dec!(6)),
    )
    .await;

    // 他の会員の貸出は存在しない貸出と区別しない
    assert!(matches!(result, Err(FineApplicationError::LoanNotFound)));
    assert!(!fine_paid(repository.as_ref(), others_loan.loan_id).await);
}

#[tokio::test]
async fn test_paying_unknown_loan_fails() {
    let member_id = MemberId::new();
    let (deps, _) = setup_deps(&[member_id], vec![]);

    let result = settle_payment(&deps, payment(member_id, Some(LoanId::new()), dec!(6))).await;

    assert!(matches!(result, Err(FineApplicationError::LoanNotFound)));
}

#[tokio::test]
async fn test_paying_already_paid_fine_rejected() {
    let member_id = MemberId::new();
    let paid = paid_late_return(member_id);
    let (deps, _) = setup_deps(&[member_id], vec![paid.clone()]);

    let result = settle_payment(&deps, payment(member_id, Some(paid.loan_id), dec!(10))).await;

    assert!(matches!(
        result,
        Err(FineApplicationError::PaymentRejected(
            SettlementError::AlreadyPaid
        ))
    ));
}

#[tokio::test]
async fn test_payment_by_unknown_member_fails() {
    let (deps, _) = setup_deps(&[], vec![]);

    let result = settle_payment(&deps, payment(MemberId::new(), None, dec!(6))).await;

    assert!(matches!(result, Err(FineApplicationError::MemberNotFound)));
}

#[tokio::test]
async fn test_settling_same_fine_twice_only_succeeds_once() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let (deps, _) = setup_deps(&[member_id], vec![late.clone()]);

    let first = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(6))).await;
    let second = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(6))).await;

    assert!(first.is_ok());
    assert!(matches!(
        second,
        Err(FineApplicationError::PaymentRejected(
            SettlementError::AlreadyPaid
        ))
    ));
}

/// 検証と更新の間に別の支払いが割り込んだ状況を再現するリポジトリ
struct RacingLoanRepository {
    inner: Arc<dyn LoanRepository>,
}

#[async_trait]
impl LoanRepository for RacingLoanRepository {
    async fn save(&self, loan: &Loan) -> RepositoryResult<()> {
        self.inner.save(loan).await
    }

    async fn get_by_id(&self, loan_id: LoanId) -> RepositoryResult<Option<Loan>> {
        self.inner.get_by_id(loan_id).await
    }

    async fn find_by_member_id(&self, member_id: MemberId) -> RepositoryResult<Vec<Loan>> {
        self.inner.find_by_member_id(member_id).await
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Loan>> {
        self.inner.find_all().await
    }

    async fn mark_fines_paid(&self, loan_ids: &[LoanId]) -> RepositoryResult<bool> {
        // 先に別の支払いが同じ罰金を精算する
        assert!(self.inner.mark_fines_paid(loan_ids).await?);
        self.inner.mark_fines_paid(loan_ids).await
    }

    async fn mark_returned(
        &self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        self.inner.mark_returned(loan_id, returned_at).await
    }
}

#[tokio::test]
async fn test_concurrent_settlement_reports_conflict() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![late.clone()]);
    let deps = ServiceDependencies {
        loan_repository: Arc::new(RacingLoanRepository { inner: repository }),
        ..deps
    };

    let result = settle_payment(&deps, payment(member_id, Some(late.loan_id), dec!(6))).await;

    assert!(matches!(
        result,
        Err(FineApplicationError::SettlementConflict)
    ));
}

// ============================================================================
// 返却
// ============================================================================

#[tokio::test]
async fn test_return_book_assesses_and_persists() {
    let member_id = MemberId::new();
    let overdue = unreturned_long_overdue(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![overdue.clone()]);

    let event = return_book(
        &deps,
        ReturnBook {
            loan_id: overdue.loan_id,
            returned_at: date(2024, 1, 3),
        },
    )
    .await
    .unwrap();

    assert_eq!(event.days_overdue, 2);
    assert_eq!(event.fine_assessed, dec!(4));

    let stored = repository.get_by_id(overdue.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.return_date, Some(date(2024, 1, 3)));
    assert!(!stored.fine_paid);
    // 返却後は基準時刻が進んでも罰金は増えない
    assert_eq!(stored.fine(date(2024, 6, 1), &policy()), dec!(4));
}

#[tokio::test]
async fn test_return_book_twice_fails() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let (deps, _) = setup_deps(&[member_id], vec![late.clone()]);

    let result = return_book(
        &deps,
        ReturnBook {
            loan_id: late.loan_id,
            returned_at: date(2024, 1, 20),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(FineApplicationError::InvalidLoanState(_))
    ));
}

#[tokio::test]
async fn test_return_leaves_paid_fine_paid() {
    let member_id = MemberId::new();
    let paid_while_out = loan(
        member_id,
        "Paid While Out",
        date(2023, 12, 18),
        date(2024, 1, 1),
        None,
        true,
    );
    let (deps, repository) = setup_deps(&[member_id], vec![paid_while_out.clone()]);

    return_book(
        &deps,
        ReturnBook {
            loan_id: paid_while_out.loan_id,
            returned_at: date(2024, 1, 20),
        },
    )
    .await
    .unwrap();

    let stored = repository
        .get_by_id(paid_while_out.loan_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.return_date, Some(date(2024, 1, 20)));
    assert!(stored.fine_paid);
}

/// 返却処理が貸出を読み込んだ直後に割り込む操作
enum Interleaved {
    Settlement,
    Return(DateTime<Utc>),
}

/// 返却の読み込みと保存の間に別の操作が完了する状況を再現するリポジトリ
struct InterleavedLoanRepository {
    inner: Arc<dyn LoanRepository>,
    interleaved: Interleaved,
}

#[async_trait]
impl LoanRepository for InterleavedLoanRepository {
    async fn save(&self, loan: &Loan) -> RepositoryResult<()> {
        self.inner.save(loan).await
    }

    async fn get_by_id(&self, loan_id: LoanId) -> RepositoryResult<Option<Loan>> {
        let loan = self.inner.get_by_id(loan_id).await?;
        match self.interleaved {
            Interleaved::Settlement => assert!(self.inner.mark_fines_paid(&[loan_id]).await?),
            Interleaved::Return(at) => assert!(self.inner.mark_returned(loan_id, at).await?),
        }
        Ok(loan)
    }

    async fn find_by_member_id(&self, member_id: MemberId) -> RepositoryResult<Vec<Loan>> {
        self.inner.find_by_member_id(member_id).await
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Loan>> {
        self.inner.find_all().await
    }

    async fn mark_fines_paid(&self, loan_ids: &[LoanId]) -> RepositoryResult<bool> {
        self.inner.mark_fines_paid(loan_ids).await
    }

    async fn mark_returned(
        &self,
        loan_id: LoanId,
        returned_at: DateTime<Utc>,
    ) -> RepositoryResult<bool> {
        self.inner.mark_returned(loan_id, returned_at).await
    }
}

#[tokio::test]
async fn test_settlement_during_return_is_not_lost() {
    let member_id = MemberId::new();
    let overdue = unreturned_long_overdue(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![overdue.clone()]);
    let racing_deps = ServiceDependencies {
        loan_repository: Arc::new(InterleavedLoanRepository {
            inner: repository.clone(),
            interleaved: Interleaved::Settlement,
        }),
        ..deps
    };

    let event = return_book(
        &racing_deps,
        ReturnBook {
            loan_id: overdue.loan_id,
            returned_at: date(2024, 1, 20),
        },
    )
    .await
    .unwrap();

    assert_eq!(event.fine_assessed, dec!(10));
    let stored = repository.get_by_id(overdue.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.return_date, Some(date(2024, 1, 20)));
    assert!(stored.fine_paid);
}

#[tokio::test]
async fn test_concurrent_return_keeps_first_return_date() {
    let member_id = MemberId::new();
    let overdue = unreturned_long_overdue(member_id);
    let (deps, repository) = setup_deps(&[member_id], vec![overdue.clone()]);
    let racing_deps = ServiceDependencies {
        loan_repository: Arc::new(InterleavedLoanRepository {
            inner: repository.clone(),
            interleaved: Interleaved::Return(date(2024, 1, 3)),
        }),
        ..deps
    };

    let result = return_book(
        &racing_deps,
        ReturnBook {
            loan_id: overdue.loan_id,
            returned_at: date(2024, 1, 20),
        },
    )
    .await;

    assert!(matches!(
        result,
        Err(FineApplicationError::InvalidLoanState(_))
    ));
    let stored = repository.get_by_id(overdue.loan_id).await.unwrap().unwrap();
    assert_eq!(stored.return_date, Some(date(2024, 1, 3)));
}

#[tokio::test]
async fn test_return_unknown_loan_fails() {
    let (deps, _) = setup_deps(&[], vec![]);

    let result = return_book(
        &deps,
        ReturnBook {
            loan_id: LoanId::new(),
            returned_at: date(2024, 1, 20),
        },
    )
    .await;

    assert!(matches!(result, Err(FineApplicationError::LoanNotFound)));
}

// ============================================================================
// 貸出一覧
// ============================================================================

#[tokio::test]
async fn test_list_loans_filters_by_status() {
    let member_a = MemberId::new();
    let member_b = MemberId::new();
    let late = returned_three_days_late(member_a);
    let overdue = unreturned_long_overdue(member_a);
    let active = loan(
        member_b,
        "Still Reading",
        date(2024, 1, 10),
        date(2024, 1, 24),
        None,
        false,
    );
    let (deps, _) = setup_deps(
        &[member_a, member_b],
        vec![late.clone(), overdue.clone(), active.clone()],
    );

    let all = list_loans(&deps, None, date(2024, 1, 20)).await.unwrap();
    assert_eq!(all.len(), 3);

    let overdue_only = list_loans(&deps, Some(LoanStatus::Overdue), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(overdue_only.len(), 1);
    let (loan, entry) = &overdue_only[0];
    assert_eq!(loan.loan_id, overdue.loan_id);
    assert_eq!(entry.loan_status, LoanStatus::Overdue);
    assert_eq!(entry.amount, dec!(10));

    let active_only = list_loans(&deps, Some(LoanStatus::Active), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(active_only.len(), 1);
    assert_eq!(active_only[0].0.loan_id, active.loan_id);

    let returned = list_loans(&deps, Some(LoanStatus::Returned), date(2024, 1, 20))
        .await
        .unwrap();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].0.loan_id, late.loan_id);
}

#[tokio::test]
async fn test_list_member_loans_includes_paid_loans() {
    let member_id = MemberId::new();
    let late = returned_three_days_late(member_id);
    let paid = paid_late_return(member_id);
    let (deps, _) = setup_deps(
        &[member_id],
        vec![
            late.clone(),
            paid.clone(),
            returned_three_days_late(MemberId::new()),
        ],
    );

    let loans = list_member_loans(&deps, member_id, date(2024, 1, 20))
        .await
        .unwrap();

    assert_eq!(loans.len(), 2);
    let (_, paid_entry) = loans
        .iter()
        .find(|(loan, _)| loan.loan_id == paid.loan_id)
        .unwrap();
    assert_eq!(paid_entry.status, FineStatus::Paid);
    assert_eq!(paid_entry.amount, dec!(10));
    assert!(loans.iter().all(|(loan, _)| loan.member_id == member_id));
}

#[tokio::test]
async fn test_list_loans_of_unknown_member_fails() {
    let (deps, _) = setup_deps(&[], vec![]);

    let result = list_member_loans(&deps, MemberId::new(), date(2024, 1, 20)).await;

    assert!(matches!(result, Err(FineApplicationError::MemberNotFound)));
}

// ============================================================================
// 集計
// ============================================================================

#[tokio::test]
async fn test_transaction_summary_over_all_members() {
    let member_a = MemberId::new();
    let member_b = MemberId::new();
    let (deps, _) = setup_deps(
        &[member_a, member_b],
        vec![
            returned_three_days_late(member_a),
            unreturned_long_overdue(member_a),
            returned_on_time(member_b),
            paid_late_return(member_b),
        ],
    );

    let summary = summarize_transactions(&deps, date(2024, 1, 20))
        .await
        .unwrap();

    assert_eq!(summary.total_loans, 4);
    assert_eq!(summary.active_loans, 1);
    assert_eq!(summary.overdue_loans, 1);
    assert_eq!(summary.total_fines, dec!(26));
    assert_eq!(summary.outstanding_fines, dec!(16));
}
