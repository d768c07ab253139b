use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookId, BookReturned, LoanError, LoanId, MemberId, ReturnBookError,
    fine::{FinePolicy, compute_fine, days_overdue},
};

/// 貸出記録の素のデータ
///
/// 永続化層や外部APIとの受け渡しに使う形。
/// 不変条件は検証されていないため、ドメインでは`Loan`に変換してから扱う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRecord {
    // 識別子
    pub loan_id: LoanId,

    // 他の集約への参照
    pub member_id: MemberId,
    pub book_id: BookId,

    // 表示用の書籍情報
    pub title: String,
    pub author: String,

    // 罰金計算の責務
    pub issue_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub fine_paid: bool,
}

/// 貸出の状態（表示・絞り込み用）
///
/// 保存はせず、返却日と基準時刻から導出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// 貸出中（期限内）
    Active,
    /// 延滞中（未返却かつ期限切れ）
    Overdue,
    /// 返却済み
    Returned,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Active => "active",
            LoanStatus::Overdue => "overdue",
            LoanStatus::Returned => "returned",
        }
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LoanStatus::Active),
            "overdue" => Ok(LoanStatus::Overdue),
            "returned" => Ok(LoanStatus::Returned),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出 - 1冊の書籍の1回の貸出
///
/// 不変条件：due_date >= issue_date（生成時に検証）。
/// return_date には下限を設けない（期限前の返却も期限後の返却もありうる）。
///
/// フィールドは`Deref`経由で読み取り専用に公開し、変更は純粋関数を通してのみ行う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan(LoanRecord);

impl std::ops::Deref for Loan {
    type Target = LoanRecord;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<LoanRecord> for Loan {
    type Error = LoanError;

    fn try_from(record: LoanRecord) -> Result<Self, Self::Error> {
        if record.due_date < record.issue_date {
            return Err(LoanError::DueBeforeIssue {
                issue_date: record.issue_date,
                due_date: record.due_date,
            });
        }
        Ok(Self(record))
    }
}

impl Loan {
    /// 新しい貸出を作成する
    ///
    /// 貸出の発行自体は外部のワークフローが担う。ここでは不変条件のみ検証する。
    pub fn new(
        member_id: MemberId,
        book_id: BookId,
        title: impl Into<String>,
        author: impl Into<String>,
        issue_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Result<Self, LoanError> {
        Self::try_from(LoanRecord {
            loan_id: LoanId::new(),
            member_id,
            book_id,
            title: title.into(),
            author: author.into(),
            issue_date,
            due_date,
            return_date: None,
            fine_paid: false,
        })
    }

    pub fn into_record(self) -> LoanRecord {
        self.0
    }

    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    /// 未返却かつ返却期限を過ぎている
    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        !self.is_returned() && as_of > self.due_date
    }

    pub fn status(&self, as_of: DateTime<Utc>) -> LoanStatus {
        if self.is_returned() {
            LoanStatus::Returned
        } else if self.is_overdue(as_of) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// この貸出の罰金額
    pub fn fine(&self, as_of: DateTime<Utc>, policy: &FinePolicy) -> rust_decimal::Decimal {
        compute_fine(self.due_date, self.return_date, as_of, policy)
    }

    pub fn days_overdue(&self, as_of: DateTime<Utc>) -> i64 {
        days_overdue(self.due_date, self.return_date, as_of)
    }

    /// 返却日を記録した新しい貸出を返す
    pub(crate) fn with_return_date(self, returned_at: DateTime<Utc>) -> Self {
        Self(LoanRecord {
            return_date: Some(returned_at),
            ..self.0
        })
    }

    /// 罰金を支払済みにした新しい貸出を返す
    pub(crate) fn with_fine_paid(self) -> Self {
        Self(LoanRecord {
            fine_paid: true,
            ..self.0
        })
    }
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - 既に返却済みの貸出は返却不可
/// - 期限前でも期限後でも返却は受け付ける
/// - 返却時点の罰金額をイベントに記録する
///
/// 副作用なし。新しいLoanとイベントを返す。
pub fn return_book(
    loan: Loan,
    returned_at: DateTime<Utc>,
    policy: &FinePolicy,
) -> Result<(Loan, BookReturned), ReturnBookError> {
    if loan.is_returned() {
        return Err(ReturnBookError::AlreadyReturned);
    }

    let returned = loan.with_return_date(returned_at);

    let event = BookReturned {
        loan_id: returned.loan_id,
        member_id: returned.member_id,
        book_id: returned.book_id,
        returned_at,
        days_overdue: returned.days_overdue(returned_at),
        fine_assessed: returned.fine(returned_at, policy),
    };

    Ok((returned, event))
}
