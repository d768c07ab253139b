use crate::domain::value_objects::MemberId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 会員サービスポート
///
/// 罰金コンテキストと会員コンテキストの境界を維持する。
/// 罰金コンテキストはMemberIDのみを知り、会員詳細は知らない。
#[async_trait]
pub trait MemberService: Send + Sync {
    /// 会員が存在するか確認する
    ///
    /// 台帳の参照と精算の前に会員を検証するために使用される。
    async fn exists(&self, member_id: MemberId) -> Result<bool>;
}
