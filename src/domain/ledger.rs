use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BookId, FinesSettled, LoanId, MemberId, ReceiptId, SettlementError,
    commands::SettlePayment,
    fine::FinePolicy,
    loan::{Loan, LoanStatus},
};

/// 罰金の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FineStatus {
    /// 罰金なし（期限内、または猶予期間内）
    None,
    /// 未払い
    Unpaid,
    /// 支払済み
    Paid,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::None => "none",
            FineStatus::Unpaid => "unpaid",
            FineStatus::Paid => "paid",
        }
    }
}

/// 1件の貸出に対する罰金の内訳
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineEntry {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub title: String,
    pub author: String,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub days_overdue: i64,
    pub amount: Decimal,
    pub status: FineStatus,
    pub loan_status: LoanStatus,
}

impl FineEntry {
    /// 純粋関数：貸出から罰金の内訳を導出する
    pub fn for_loan(loan: &Loan, as_of: DateTime<Utc>, policy: &FinePolicy) -> Self {
        let amount = loan.fine(as_of, policy);
        let status = if amount.is_zero() {
            FineStatus::None
        } else if loan.fine_paid {
            FineStatus::Paid
        } else {
            FineStatus::Unpaid
        };

        Self {
            loan_id: loan.loan_id,
            book_id: loan.book_id,
            title: loan.title.clone(),
            author: loan.author.clone(),
            due_date: loan.due_date,
            return_date: loan.return_date,
            days_overdue: loan.days_overdue(as_of),
            amount,
            status,
            loan_status: loan.status(as_of),
        }
    }
}

/// 会員の罰金台帳ビュー
///
/// 保存はせず、貸出記録から読み取り時に毎回導出する。
/// entries には未払いかつ罰金額が0より大きい貸出のみを含む。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineLedger {
    pub member_id: MemberId,
    pub as_of: DateTime<Utc>,
    pub entries: Vec<FineEntry>,
    pub total: Decimal,
}

impl FineLedger {
    /// 純粋関数：会員の貸出から台帳を構築する
    ///
    /// 他の会員の貸出が混ざっていても無視する。
    pub fn build(
        member_id: MemberId,
        loans: &[Loan],
        as_of: DateTime<Utc>,
        policy: &FinePolicy,
    ) -> Self {
        let entries: Vec<FineEntry> = loans
            .iter()
            .filter(|loan| loan.member_id == member_id)
            .map(|loan| FineEntry::for_loan(loan, as_of, policy))
            .filter(|entry| entry.status == FineStatus::Unpaid)
            .collect();

        let total = entries.iter().map(|entry| entry.amount).sum();

        Self {
            member_id,
            as_of,
            entries,
            total,
        }
    }

    /// 未払い罰金がなければ新たな貸出を受けられる
    pub fn can_borrow(&self) -> bool {
        self.total.is_zero()
    }

    pub fn entry(&self, loan_id: LoanId) -> Option<&FineEntry> {
        self.entries.iter().find(|entry| entry.loan_id == loan_id)
    }
}

/// 純粋関数：支払いを検証し、精算対象を確定する
///
/// ビジネスルール：
/// - 支払額は0より大きいこと
/// - loan_id 指定時：その貸出が会員のものであり、未払いの罰金があること
/// - loan_id 未指定時：会員の未払い罰金の合計を対象とする
/// - 支払額は対象の罰金額と完全に一致すること（不足も超過も拒否）
///
/// 副作用なし。精算イベントを返すだけで、fine_paid の更新は呼び出し側が行う。
pub fn settle_payment(
    loans: &[Loan],
    cmd: &SettlePayment,
    policy: &FinePolicy,
) -> Result<FinesSettled, SettlementError> {
    if cmd.amount <= Decimal::ZERO {
        return Err(SettlementError::InvalidAmount);
    }

    let (loan_ids, owed) = match cmd.loan_id {
        Some(loan_id) => {
            let loan = loans
                .iter()
                .find(|loan| loan.loan_id == loan_id)
                .ok_or(SettlementError::LoanNotFound)?;

            if loan.member_id != cmd.member_id {
                return Err(SettlementError::NotMembersLoan);
            }

            let entry = FineEntry::for_loan(loan, cmd.requested_at, policy);
            match entry.status {
                FineStatus::Paid => return Err(SettlementError::AlreadyPaid),
                FineStatus::None => return Err(SettlementError::NothingOwed),
                FineStatus::Unpaid => (vec![loan_id], entry.amount),
            }
        }
        None => {
            let ledger = FineLedger::build(cmd.member_id, loans, cmd.requested_at, policy);
            if ledger.entries.is_empty() {
                return Err(SettlementError::NothingOwed);
            }
            let loan_ids = ledger.entries.iter().map(|entry| entry.loan_id).collect();
            (loan_ids, ledger.total)
        }
    };

    if cmd.amount < owed {
        return Err(SettlementError::InsufficientAmount {
            owed,
            paid: cmd.amount,
        });
    }
    if cmd.amount > owed {
        return Err(SettlementError::Overpayment {
            owed,
            paid: cmd.amount,
        });
    }

    Ok(FinesSettled {
        receipt_id: ReceiptId::new(),
        member_id: cmd.member_id,
        loan_ids,
        amount: owed,
        payment_method: cmd.payment_method,
        settled_at: cmd.requested_at,
    })
}

/// 貸出全体の集計（職員向け）
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionSummary {
    pub total_loans: usize,
    pub active_loans: usize,
    pub overdue_loans: usize,
    /// 支払済みを含むすべての罰金の合計
    pub total_fines: Decimal,
    /// 未払い罰金の合計
    pub outstanding_fines: Decimal,
}

impl TransactionSummary {
    /// 純粋関数：貸出の一覧を集計する
    pub fn from_loans(loans: &[Loan], as_of: DateTime<Utc>, policy: &FinePolicy) -> Self {
        loans.iter().fold(Self::default(), |mut summary, loan| {
            let fine = loan.fine(as_of, policy);

            summary.total_loans += 1;
            if !loan.is_returned() {
                summary.active_loans += 1;
            }
            if loan.is_overdue(as_of) {
                summary.overdue_loans += 1;
            }
            summary.total_fines += fine;
            if !loan.fine_paid {
                summary.outstanding_fines += fine;
            }
            summary
        })
    }
}
