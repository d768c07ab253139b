use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LoanId, MemberId, PaymentMethod};

/// コマンド：罰金を支払う
///
/// loan_id が None の場合は会員の未払い罰金をすべて支払う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlePayment {
    pub member_id: MemberId,
    pub loan_id: Option<LoanId>,
    pub amount: Decimal,
    pub payment_method: PaymentMethod,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}
