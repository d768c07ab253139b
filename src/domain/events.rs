use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, MemberId, PaymentMethod, ReceiptId};

/// イベント：書籍が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub loan_id: LoanId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub returned_at: DateTime<Utc>,
    pub days_overdue: i64,
    /// 返却時点の罰金額
    pub fine_assessed: Decimal,
}

/// イベント：罰金が精算された
///
/// そのまま領収書として呼び出し側に返される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinesSettled {
    pub receipt_id: ReceiptId,
    pub member_id: MemberId,
    pub loan_ids: Vec<LoanId>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub settled_at: DateTime<Utc>,
}
