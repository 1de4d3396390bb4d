//! Access-code resolution.
//!
//! Two encodings are accepted:
//!
//! - structured `COUNTRY-SCHOOL-TOKEN-PERIOD` codes, shared by a whole class and
//!   never consumed. `TOKEN` is compared against every teacher's decrypted access
//!   code; the stored value is only comparable after decryption, so this is a
//!   linear scan.
//! - opaque registry codes looked up verbatim in the `Access Codes` collection.
//!   These are single use; consumption is recorded by the coordinator.

use crate::models::{AccessCodeRecord, CodeType, Teacher};
use crate::services::cipher::AccessCodeCipher;
use crate::services::error::ProvisioningError;
use crate::services::metrics;
use crate::services::store::ProvisioningStore;
use std::sync::Arc;

/// A structured code split into its four segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredCode {
    pub country: String,
    pub school: String,
    pub token: String,
    pub period: String,
}

impl StructuredCode {
    /// Returns `None` unless the code has exactly four hyphen-separated segments.
    pub fn parse(code: &str) -> Option<Self> {
        let segments: Vec<&str> = code.split('-').collect();
        match segments.as_slice() {
            [country, school, token, period] => Some(Self {
                country: country.to_string(),
                school: school.to_string(),
                token: token.to_string(),
                period: period.to_string(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Resolution {
    /// Structured code matched a teacher's token.
    Structured { teacher: Teacher, period: String },
    /// Registry code issued to a student.
    RegistryStudent { record: AccessCodeRecord },
    /// Registry code that enrolls a new teacher.
    RegistryTeacher { record: AccessCodeRecord },
}

impl Resolution {
    pub fn mode(&self) -> &'static str {
        match self {
            Resolution::Structured { .. } => "structured",
            Resolution::RegistryStudent { .. } => "registry_student",
            Resolution::RegistryTeacher { .. } => "registry_teacher",
        }
    }
}

#[derive(Clone)]
pub struct AccessCodeResolver {
    store: Arc<dyn ProvisioningStore>,
    cipher: AccessCodeCipher,
}

impl AccessCodeResolver {
    pub fn new(store: Arc<dyn ProvisioningStore>, cipher: AccessCodeCipher) -> Self {
        Self { store, cipher }
    }

    pub fn cipher(&self) -> &AccessCodeCipher {
        &self.cipher
    }

    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, code: Option<&str>) -> Result<Resolution, ProvisioningError> {
        let code = match code {
            Some(c) if !c.is_empty() => c,
            _ => return Err(ProvisioningError::MissingCode),
        };

        if let Some(structured) = StructuredCode::parse(code) {
            let teacher = self
                .find_teacher_by_token(&structured.token)
                .await?
                .ok_or(ProvisioningError::InvalidCode)?;

            tracing::info!(
                teacher = %teacher.username,
                period = %structured.period,
                "Structured access code matched teacher"
            );
            return Ok(Resolution::Structured {
                teacher,
                period: structured.period,
            });
        }

        let record = self
            .store
            .find_access_code(code)
            .await?
            .ok_or(ProvisioningError::InvalidCode)?;

        if record.used {
            tracing::info!(code_type = record.code_type.as_str(), "Registry code already used");
            return Err(ProvisioningError::InvalidCode);
        }

        match record.code_type {
            CodeType::Teacher => {
                // A teacher code may only ever back one teacher record.
                if self.find_teacher_by_token(code).await?.is_some() {
                    tracing::warn!("Teacher code already registered to an existing teacher");
                    return Err(ProvisioningError::InvalidCode);
                }
                Ok(Resolution::RegistryTeacher { record })
            }
            CodeType::Student => Ok(Resolution::RegistryStudent { record }),
        }
    }

    /// First teacher, in store order, whose decrypted access code equals `token`.
    ///
    /// Records that fail to decrypt are skipped; they never abort the scan.
    pub async fn find_teacher_by_token(
        &self,
        token: &str,
    ) -> Result<Option<Teacher>, ProvisioningError> {
        let teachers = self.store.list_teachers().await?;
        metrics::record_scan_size(teachers.len());

        for teacher in teachers {
            match self.cipher.decrypt(&teacher.access_code) {
                Ok(decrypted) if decrypted == token => return Ok(Some(teacher)),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        teacher = %teacher.username,
                        error = %e,
                        "Failed to decrypt teacher access code"
                    );
                }
            }
        }

        Ok(None)
    }
}
