use crate::domain::{
    loan::Loan,
    value_objects::{LoanId, MemberId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出リポジトリポート
///
/// 貸出記録の取得と、返却・罰金支払いによる更新を抽象化する。
/// 貸出の発行は外部のワークフローが担うため、ここでは扱わない。
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 新しい貸出を登録する
    ///
    /// 発行ワークフローからの取り込み用。既に同じIDの貸出があれば何もしない。
    /// 既存の貸出の更新は`mark_returned`と`mark_fines_paid`のみで行う。
    async fn save(&self, loan: &Loan) -> Result<()>;

    /// IDで貸出を取得する
    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 会員の全貸出を取得する
    ///
    /// 罰金台帳の構築と精算に使用される。
    async fn find_by_member_id(&self, member_id: MemberId) -> Result<Vec<Loan>>;

    /// すべての貸出を取得する
    ///
    /// 職員向けの集計に使用される。
    async fn find_all(&self) -> Result<Vec<Loan>>;

    /// 指定した貸出の罰金をまとめて支払済みにする
    ///
    /// 全件が未払いから支払済みに変わった場合のみ反映し、`true`を返す。
    /// 1件でも既に支払済みだった場合は何も変更せず`false`を返す。
    async fn mark_fines_paid(&self, loan_ids: &[LoanId]) -> Result<bool>;

    /// 未返却の貸出に返却日を記録する
    ///
    /// return_date のみを更新し、fine_paid には触れない。
    /// 貸出が存在しないか既に返却済みの場合は何も変更せず`false`を返す。
    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool>;
}
