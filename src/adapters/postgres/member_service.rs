use crate::domain::value_objects::MemberId;
use crate::ports::member_service::{MemberService as MemberServiceTrait, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// PostgreSQL implementation of MemberService
///
/// Looks the member up in the `members` registry table.
pub struct MemberService {
    pool: PgPool,
}

impl MemberService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a member id (idempotent)
    pub async fn register(&self, member_id: MemberId) -> Result<()> {
        sqlx::query("INSERT INTO members (member_id) VALUES ($1) ON CONFLICT (member_id) DO NOTHING")
            .bind(member_id.value())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MemberServiceTrait for MemberService {
    async fn exists(&self, member_id: MemberId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM members WHERE member_id = $1)")
                .bind(member_id.value())
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}
