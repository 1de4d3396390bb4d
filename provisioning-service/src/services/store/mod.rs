//! Durable storage for teachers, student accounts and the code registry.
//!
//! Handles are opened once at startup and passed explicitly. Every operation is
//! an independent exact-match read or single-document write; nothing spans
//! documents.

pub mod memory;
pub mod mongo;

use crate::models::{AccessCodeRecord, Account, OAuthCredentials, RosterEntry, Teacher};
use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

pub use memory::InMemoryStore;
pub use mongo::MongoStore;

pub const TEACHERS_COLLECTION: &str = "Teachers";
pub const ACCOUNTS_COLLECTION: &str = "User Profiles";
pub const ACCESS_CODES_COLLECTION: &str = "Access Codes";

#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError>;

    async fn find_teacher_by_username(&self, username: &str)
        -> Result<Option<Teacher>, AppError>;

    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), AppError>;

    async fn find_access_code(&self, code: &str) -> Result<Option<AccessCodeRecord>, AppError>;

    /// Mark a registry code used if, and only if, it is currently unused.
    ///
    /// Returns `true` for the single caller that wins the transition.
    async fn claim_access_code(&self, code: &str, used_by: &str) -> Result<bool, AppError>;

    async fn insert_account(&self, account: &Account) -> Result<(), AppError>;

    async fn find_account_by_username(&self, user_name: &str)
        -> Result<Option<Account>, AppError>;

    /// Append to the roster of `period` on the given teacher.
    ///
    /// Returns `false` when the teacher has no such period; nothing is created.
    async fn append_to_roster(
        &self,
        teacher_id: &ObjectId,
        period: &str,
        entry: &RosterEntry,
    ) -> Result<bool, AppError>;

    /// Returns `false` when no teacher has this username.
    async fn store_teacher_oauth(
        &self,
        username: &str,
        credentials: &OAuthCredentials,
    ) -> Result<bool, AppError>;

    async fn health_check(&self) -> Result<(), AppError>;
}
