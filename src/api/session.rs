use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::MemberId;

use super::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// 利用者の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Librarian => "librarian",
            Role::Member => "member",
        }
    }

    /// 職員（管理者または司書）
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Librarian)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "member" => Ok(Role::Member),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// リクエストごとの利用者情報
///
/// 認証は上流のゲートウェイが行い、結果をヘッダーで渡す前提。
/// ここではヘッダーの形式のみ検証する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
}

impl Session {
    /// 会員本人または職員
    pub fn can_access(&self, member_id: MemberId) -> bool {
        self.role.is_staff() || self.user_id == member_id.value()
    }

    /// 会員本人または職員であることを確認する
    pub fn authorize_member(&self, member_id: MemberId) -> Result<(), ApiError> {
        if self.can_access(member_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// 職員であることを確認する
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

fn header<'a>(parts: &'a Parts, name: &'static str) -> Result<&'a str, ApiError> {
    parts
        .headers
        .get(name)
        .ok_or(ApiError::Unauthorized("Missing session header"))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Malformed session header"))
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = Uuid::parse_str(header(parts, USER_ID_HEADER)?.trim())
            .map_err(|_| ApiError::Unauthorized("Malformed user id"))?;
        let role = header(parts, USER_ROLE_HEADER)?
            .trim()
            .parse::<Role>()
            .map_err(|_| ApiError::Unauthorized("Unknown role"))?;

        Ok(Session { user_id, role })
    }
}
