//! Registry codes from the `Access Codes` collection.

use super::ClassPeriod;
use mongodb::bson::DateTime as BsonDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeType {
    Teacher,
    Student,
}

impl CodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodeType::Teacher => "teacher",
            CodeType::Student => "student",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeRecord {
    pub code: String,
    #[serde(rename = "type")]
    pub code_type: CodeType,
    #[serde(default)]
    pub teacher: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub class_period: Option<ClassPeriod>,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub used_by: Option<String>,
    #[serde(default)]
    pub used_at: Option<BsonDateTime>,
}

impl AccessCodeRecord {
    pub fn new(code: impl Into<String>, code_type: CodeType) -> Self {
        Self {
            code: code.into(),
            code_type,
            teacher: None,
            school: None,
            class_period: None,
            used: false,
            used_by: None,
            used_at: None,
        }
    }
}
