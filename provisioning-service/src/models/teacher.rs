//! Teacher records from the `Teachers` collection.

use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub username: String,
}

/// One class period and the students enrolled in it, in join order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    /// Kept as text so leading zeros ("02") survive.
    pub period: String,
    #[serde(default)]
    pub students: Vec<RosterEntry>,
}

impl Period {
    pub fn new(period: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            students: Vec::new(),
        }
    }
}

/// Tokens obtained from the identity provider during enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuthCredentials {
    pub provider: String,
    pub email: String,
    #[serde(rename = "access_token")]
    pub access_token: String,
    #[serde(rename = "refresh_token")]
    pub refresh_token: Option<String>,
    #[serde(rename = "id_token")]
    pub id_token: Option<String>,
    #[serde(
        alias = "token_obtained",
        with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime"
    )]
    pub obtained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    /// Reversible ciphertext of the teacher's access code.
    pub access_code: String,
    pub username: String,
    /// One-way PIN hash.
    pub pin: String,
    pub school: String,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth: Option<OAuthCredentials>,
}

impl Teacher {
    pub fn period(&self, period: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.period == period)
    }

    pub fn profile(&self) -> TeacherProfile {
        TeacherProfile::from(self)
    }
}

/// Teacher as returned to callers, without the PIN hash or code ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherProfile {
    pub name: String,
    pub username: String,
    pub school: String,
    pub periods: Vec<Period>,
}

impl From<&Teacher> for TeacherProfile {
    fn from(teacher: &Teacher) -> Self {
        Self {
            name: teacher.name.clone(),
            username: teacher.username.clone(),
            school: teacher.school.clone(),
            periods: teacher.periods.clone(),
        }
    }
}
