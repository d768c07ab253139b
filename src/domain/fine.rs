use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use super::FinePolicyError;

/// 金額の小数点以下桁数（セント単位）
pub const MONEY_SCALE: u32 = 2;

/// 金額をセント単位に丸める
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// 罰金ポリシー
///
/// 起動時に設定から一度だけ読み込まれ、すべての罰金計算で共有される。
/// 不変条件：料率と上限はいずれも0以上。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    rate_per_day: Decimal,
    max_per_loan: Decimal,
    grace_period_days: u32,
}

impl FinePolicy {
    pub fn new(
        rate_per_day: Decimal,
        max_per_loan: Decimal,
        grace_period_days: u32,
    ) -> Result<Self, FinePolicyError> {
        if rate_per_day < Decimal::ZERO {
            return Err(FinePolicyError::NegativeRate);
        }
        if max_per_loan < Decimal::ZERO {
            return Err(FinePolicyError::NegativeCap);
        }
        Ok(Self {
            rate_per_day,
            max_per_loan,
            grace_period_days,
        })
    }

    pub fn rate_per_day(&self) -> Decimal {
        self.rate_per_day
    }

    pub fn max_per_loan(&self) -> Decimal {
        self.max_per_loan
    }

    pub fn grace_period_days(&self) -> u32 {
        self.grace_period_days
    }
}

/// 純粋関数：延滞日数
///
/// 基準時刻は返却日（未返却なら as_of）。
/// 返却期限を1秒でも過ぎれば1日と数える（切り上げ）。
pub fn days_overdue(
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
) -> i64 {
    let reference = return_date.unwrap_or(as_of);
    let late = reference - due_date;
    if late <= Duration::zero() {
        return 0;
    }

    let whole_days = late.num_days();
    if late > Duration::days(whole_days) {
        whole_days + 1
    } else {
        whole_days
    }
}

/// 純粋関数：罰金額
///
/// ビジネスルール：
/// - 延滞日数 × 1日あたりの料率
/// - 猶予期間内の延滞は0
/// - 1冊あたりの上限で打ち切る
///
/// 延滞日数に対して単調非減少。副作用なし。
pub fn compute_fine(
    due_date: DateTime<Utc>,
    return_date: Option<DateTime<Utc>>,
    as_of: DateTime<Utc>,
    policy: &FinePolicy,
) -> Decimal {
    let days = days_overdue(due_date, return_date, as_of);
    if days <= i64::from(policy.grace_period_days) {
        return Decimal::ZERO;
    }

    let raw = Decimal::from(days)
        .checked_mul(policy.rate_per_day)
        .unwrap_or(Decimal::MAX);
    round_money(raw.min(policy.max_per_loan))
}
