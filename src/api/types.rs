use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    BookReturned, FinesSettled, LoanId, MemberId, PaymentMethod,
    commands::SettlePayment,
    fine::MONEY_SCALE,
    ledger::{FineEntry, FineLedger, TransactionSummary},
    loan::{Loan, LoanStatus},
};

/// 金額を小数点以下2桁の表記に揃える（"6" → "6.00"）
fn money(amount: Decimal) -> Decimal {
    let mut amount = amount;
    amount.rescale(MONEY_SCALE);
    amount
}

/// 罰金の内訳（台帳の1行）
#[derive(Debug, Serialize, Deserialize)]
pub struct FineEntryResponse {
    pub loan_id: Uuid,
    pub book_id: Uuid,
    pub title: String,
    pub author: String,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub days_overdue: i64,
    pub amount: Decimal,
    pub status: String,
    pub loan_status: String,
}

impl From<FineEntry> for FineEntryResponse {
    fn from(entry: FineEntry) -> Self {
        Self {
            loan_id: entry.loan_id.value(),
            book_id: entry.book_id.value(),
            title: entry.title,
            author: entry.author,
            due_date: entry.due_date,
            return_date: entry.return_date,
            days_overdue: entry.days_overdue,
            amount: money(entry.amount),
            status: entry.status.as_str().to_string(),
            loan_status: entry.loan_status.as_str().to_string(),
        }
    }
}

/// 罰金台帳レスポンス（GET /members/:member_id/fines）
#[derive(Debug, Serialize, Deserialize)]
pub struct FineLedgerResponse {
    pub member_id: Uuid,
    pub as_of: DateTime<Utc>,
    pub fines: Vec<FineEntryResponse>,
    pub total_fine: Decimal,
    pub can_borrow: bool,
}

impl From<FineLedger> for FineLedgerResponse {
    fn from(ledger: FineLedger) -> Self {
        let can_borrow = ledger.can_borrow();
        Self {
            member_id: ledger.member_id.value(),
            as_of: ledger.as_of,
            fines: ledger.entries.into_iter().map(Into::into).collect(),
            total_fine: money(ledger.total),
            can_borrow,
        }
    }
}

/// 1件の貸出の罰金レスポンス
///
/// GET /loans/:loan_id/fine と、貸出一覧の各行で使う。
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanFineResponse {
    pub member_id: Uuid,
    pub fine_paid: bool,
    pub fine: FineEntryResponse,
}

impl LoanFineResponse {
    pub fn new(loan: &Loan, entry: FineEntry) -> Self {
        Self {
            member_id: loan.member_id.value(),
            fine_paid: loan.fine_paid,
            fine: entry.into(),
        }
    }
}

/// 貸出一覧の絞り込み（GET /loans?status=...）
#[derive(Debug, Default, Deserialize)]
pub struct ListLoansQuery {
    #[serde(default)]
    pub status: Option<LoanStatus>,
}

/// 支払いリクエスト（POST /payments）
///
/// loan_id を省略すると会員の未払い罰金をすべて精算する。
#[derive(Debug, Deserialize)]
pub struct PaymentRequest {
    pub amount: Decimal,
    pub member_id: Uuid,
    #[serde(default)]
    pub loan_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
}

impl PaymentRequest {
    pub fn to_command(&self, requested_at: DateTime<Utc>) -> SettlePayment {
        SettlePayment {
            member_id: MemberId::from_uuid(self.member_id),
            loan_id: self.loan_id.map(LoanId::from_uuid),
            amount: self.amount,
            payment_method: self.payment_method,
            requested_at,
        }
    }
}

/// 領収書レスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentReceiptResponse {
    pub receipt_id: Uuid,
    pub member_id: Uuid,
    pub loan_ids: Vec<Uuid>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub settled_at: DateTime<Utc>,
}

impl From<FinesSettled> for PaymentReceiptResponse {
    fn from(event: FinesSettled) -> Self {
        Self {
            receipt_id: event.receipt_id.value(),
            member_id: event.member_id.value(),
            loan_ids: event.loan_ids.iter().map(LoanId::value).collect(),
            amount: money(event.amount),
            payment_method: event.payment_method,
            settled_at: event.settled_at,
        }
    }
}

/// 返却レスポンス（POST /loans/:loan_id/return）
#[derive(Debug, Serialize, Deserialize)]
pub struct BookReturnedResponse {
    pub loan_id: Uuid,
    pub member_id: Uuid,
    pub returned_at: DateTime<Utc>,
    pub days_overdue: i64,
    pub fine_assessed: Decimal,
}

impl From<BookReturned> for BookReturnedResponse {
    fn from(event: BookReturned) -> Self {
        Self {
            loan_id: event.loan_id.value(),
            member_id: event.member_id.value(),
            returned_at: event.returned_at,
            days_overdue: event.days_overdue,
            fine_assessed: money(event.fine_assessed),
        }
    }
}

/// 貸出集計レスポンス（GET /loans/summary）
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionSummaryResponse {
    pub total_loans: usize,
    pub active_loans: usize,
    pub overdue_loans: usize,
    pub total_fines: Decimal,
    pub outstanding_fines: Decimal,
}

impl From<TransactionSummary> for TransactionSummaryResponse {
    fn from(summary: TransactionSummary) -> Self {
        Self {
            total_loans: summary.total_loans,
            active_loans: summary.active_loans,
            overdue_loans: summary.overdue_loans,
            total_fines: money(summary.total_fines),
            outstanding_fines: money(summary.outstanding_fines),
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
