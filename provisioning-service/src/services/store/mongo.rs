use super::{
    ProvisioningStore, ACCESS_CODES_COLLECTION, ACCOUNTS_COLLECTION, TEACHERS_COLLECTION,
};
use crate::models::{AccessCodeRecord, Account, OAuthCredentials, RosterEntry, Teacher};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, to_bson, DateTime as BsonDateTime, Document},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct MongoStore {
    client: MongoClient,
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for provisioning-service");

        let code_index = IndexModel::builder()
            .keys(doc! { "code": 1 })
            .options(
                IndexOptions::builder()
                    .name("code_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.access_codes()
            .create_index(code_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create access code index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        let teacher_username_index = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(
                IndexOptions::builder()
                    .name("username_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        self.teachers()
            .create_index(teacher_username_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create teacher username index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        // Not unique: replicated copies and legacy duplicates already exist.
        let account_username_index = IndexModel::builder()
            .keys(doc! { "userName": 1 })
            .options(
                IndexOptions::builder()
                    .name("user_name_idx".to_string())
                    .build(),
            )
            .build();

        self.accounts()
            .create_index(account_username_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create account userName index: {}", e);
                AppError::DatabaseError(anyhow::anyhow!(e.to_string()))
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn teachers(&self) -> Collection<Teacher> {
        self.db.collection(TEACHERS_COLLECTION)
    }

    pub fn accounts(&self) -> Collection<Account> {
        self.db.collection(ACCOUNTS_COLLECTION)
    }

    pub fn access_codes(&self) -> Collection<AccessCodeRecord> {
        self.db.collection(ACCESS_CODES_COLLECTION)
    }
}

/// Convert raw teacher documents, skipping any that do not fit the model.
fn decode_teachers(documents: Vec<Document>) -> Vec<Teacher> {
    documents
        .into_iter()
        .filter_map(|document| {
            let id = document.get_object_id("_id").ok();
            match from_document::<Teacher>(document) {
                Ok(teacher) => Some(teacher),
                Err(e) => {
                    tracing::warn!(teacher_id = ?id, error = %e, "Skipping unreadable teacher record");
                    None
                }
            }
        })
        .collect()
}

fn db_error(context: &str, e: mongodb::error::Error) -> AppError {
    tracing::error!("{}: {}", context, e);
    AppError::DatabaseError(anyhow::anyhow!("{}: {}", context, e))
}

#[async_trait]
impl ProvisioningStore for MongoStore {
    async fn list_teachers(&self) -> Result<Vec<Teacher>, AppError> {
        let cursor = self
            .db
            .collection::<Document>(TEACHERS_COLLECTION)
            .find(doc! {}, None)
            .await
            .map_err(|e| db_error("Failed to list teachers", e))?;

        let documents: Vec<Document> = cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect teachers", e))?;

        Ok(decode_teachers(documents))
    }

    async fn find_teacher_by_username(
        &self,
        username: &str,
    ) -> Result<Option<Teacher>, AppError> {
        self.teachers()
            .find_one(doc! { "username": username }, None)
            .await
            .map_err(|e| db_error("Failed to find teacher", e))
    }

    async fn insert_teacher(&self, teacher: &Teacher) -> Result<(), AppError> {
        self.teachers()
            .insert_one(teacher, None)
            .await
            .map_err(|e| db_error("Failed to insert teacher", e))?;
        Ok(())
    }

    async fn find_access_code(&self, code: &str) -> Result<Option<AccessCodeRecord>, AppError> {
        self.access_codes()
            .find_one(doc! { "code": code }, None)
            .await
            .map_err(|e| db_error("Failed to find access code", e))
    }

    async fn claim_access_code(&self, code: &str, used_by: &str) -> Result<bool, AppError> {
        // Filter and update in one statement: only one caller can match `used != true`.
        let result = self
            .access_codes()
            .update_one(
                doc! { "code": code, "used": { "$ne": true } },
                doc! {
                    "$set": {
                        "used": true,
                        "usedBy": used_by,
                        "usedAt": BsonDateTime::now(),
                    }
                },
                None,
            )
            .await
            .map_err(|e| db_error("Failed to claim access code", e))?;

        Ok(result.modified_count == 1)
    }

    async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        self.accounts()
            .insert_one(account, None)
            .await
            .map_err(|e| db_error("Failed to insert account", e))?;
        Ok(())
    }

    async fn find_account_by_username(
        &self,
        user_name: &str,
    ) -> Result<Option<Account>, AppError> {
        self.accounts()
            .find_one(doc! { "userName": user_name }, None)
            .await
            .map_err(|e| db_error("Failed to find account", e))
    }

    async fn append_to_roster(
        &self,
        teacher_id: &ObjectId,
        period: &str,
        entry: &RosterEntry,
    ) -> Result<bool, AppError> {
        let entry = to_bson(entry).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to encode roster entry: {}", e))
        })?;

        let result = self
            .teachers()
            .update_one(
                doc! { "_id": *teacher_id, "periods.period": period },
                doc! { "$push": { "periods.$.students": entry } },
                None,
            )
            .await
            .map_err(|e| db_error("Failed to append to roster", e))?;

        Ok(result.matched_count > 0)
    }

    async fn store_teacher_oauth(
        &self,
        username: &str,
        credentials: &OAuthCredentials,
    ) -> Result<bool, AppError> {
        let credentials = to_bson(credentials).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to encode OAuth credentials: {}", e))
        })?;

        let result = self
            .teachers()
            .update_one(
                doc! { "username": username },
                doc! { "$set": { "oauth": credentials } },
                None,
            )
            .await
            .map_err(|e| db_error("Failed to store OAuth credentials", e))?;

        Ok(result.matched_count > 0)
    }

    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| db_error("MongoDB health check failed", e))?;
        Ok(())
    }
}
