use super::ProvisioningStore;
use crate::models::{AccessCodeRecord, Account, OAuthCredentials, RosterEntry, Teacher};
use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use service_core::error::AppError;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Collections {
    teachers: Vec<Teacher>,
    accounts: Vec<Account>,
    access_codes: Vec<AccessCodeRecord>,
}

/// Process-local store for tests and local runs without MongoDB.
///
/// Clones share the same data. Each operation takes the lock once, so the
/// conditional claim is atomic just like the MongoDB filter-and-update.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Collections>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a registry code.
    pub fn add_access_code(&self, record: AccessCodeRecord) {
        if let Ok(mut data) = self.inner.write() {
            data.access_codes.push(record);
        }
    }

    /// Seed a teacher directly, bypassing enrollment.
    pub fn add_teacher(&self, teacher: Teacher) {
        if let Ok(mut data) = self.inner.write() {
            data.teachers.push(teacher);
        }
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.inner
            .read()
            .map(|data| data.accounts.clone())
            .unwrap_or_default()
    }

    pub fn teachers(&self) -> Vec<Teacher> {
        self.inner
            .read()
            .map(|data| data.teachers.clone())
            .unwrap_or_default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Collections>, AppError> {
        self.inner
            .read()
            .map_err(|_| AppError::DatabaseError(anyhow::anyhow!("in-memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Collections>, AppError> {
        self.inner
            .write()
            .map_err(|_| AppError::DatabaseError(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

#[async_trait]
impl ProvisioningStore for InMemoryStore {
    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        Ok(self.read()?.teachers.clone())
    }

    async fn find_teacher_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Teacher>, AppError> {
        Ok(self
            .read()?
            .teachers
            .iter()
            .find(|t| t.username == username)
            .cloned())
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), AppError> {
        let mut data = self.write()?;
        if data.teachers.iter().any(|t| t.username == teacher.username) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "duplicate teacher username '{}'",
                teacher.username
            )));
        }
        data.teachers.push(teacher.clone());
        Ok(())
    }

    async fn find_access_code(&self, code: &str) -> Result<Option<AccessCodeRecord>, AppError> {
        Ok(self
            .read()?
            .access_codes
            .iter()
            .find(|c| c.code == code)
            .cloned())
    }

    async fn claim_access_code(&self, code: &str, used_by: &str) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data
            .access_codes
            .iter_mut()
            .find(|c| c.code == code && !c.used)
        {
            Some(record) => {
                record.used = true;
                record.used_by = Some(used_by.to_string());
                record.used_at = Some(BsonDateTime::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        self.write()?.accounts.push(account.clone());
        Ok(())
    }

    async fn find_account_by_username(
        &self,
        user_name: &str,
    ) -> Result<Option<Account>, AppError> {
        Ok(self
            .read()?
            .accounts
            .iter()
            .find(|a| a.user_name == user_name)
            .cloned())
    }

    async fn append_to_roster(
        &self,
        teacher_id: &ObjectId,
        period: &str,
        entry: &RosterEntry,
    ) -> Result<bool, AppError> {
        let mut data = self.write()?;
        let slot = data
            .teachers
            .iter_mut()
            .find(|t| &t.id == teacher_id)
            .and_then(|t| t.periods.iter_mut().find(|p| p.period == period));

        match slot {
            Some(p) => {
                p.students.push(entry.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn store_teacher_oauth(
        &self,
        username: &str,
        credentials: &OAuthCredentials,
    ) -> Result<bool, AppError> {
        let mut data = self.write()?;
        match data.teachers.iter_mut().find(|t| t.username == username) {
            Some(teacher) => {
                teacher.oauth = Some(credentials.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.read().map(|_| ())
    }
}
