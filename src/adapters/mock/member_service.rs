use crate::domain::value_objects::MemberId;
use crate::ports::member_service::{MemberService as MemberServiceTrait, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Mock implementation of MemberService
///
/// Supports stateful testing by storing member IDs.
pub struct MemberService {
    existing_members: Mutex<HashSet<MemberId>>,
}

impl MemberService {
    pub fn new() -> Self {
        Self {
            existing_members: Mutex::new(HashSet::new()),
        }
    }

    /// Register a member
    pub fn add_member(&self, member_id: MemberId) {
        self.existing_members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(member_id);
    }
}

impl Default for MemberService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemberServiceTrait for MemberService {
    /// Check if member exists in the registered members
    async fn exists(&self, member_id: MemberId) -> Result<bool> {
        Ok(self
            .existing_members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&member_id))
    }
}
