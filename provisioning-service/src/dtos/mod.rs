use crate::models::{Account, TeacherProfile};
use crate::services::PersonalDetails;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

/// Body of `POST /createAccount`.
///
/// `parcel` is positional: first name, last name, access code, date,
/// username, PIN.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(
        equal = 6,
        message = "parcel must contain exactly 6 entries"
    ))]
    pub parcel: Vec<Value>,
}

/// Text of one parcel entry. Numbers and booleans are taken verbatim so a
/// numeric PIN still reaches PIN validation; null and structured values are absent.
fn entry_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl CreateAccountRequest {
    fn entry(&self, index: usize) -> Option<String> {
        self.parcel.get(index).and_then(entry_text)
    }

    fn field(&self, index: usize) -> String {
        self.entry(index).unwrap_or_default()
    }

    pub fn access_code(&self) -> Option<String> {
        self.entry(2)
    }

    pub fn personal_details(&self) -> PersonalDetails {
        PersonalDetails {
            first_name: self.field(0),
            last_name: self.field(1),
            date: self.field(3),
            user_name: self.field(4),
            pin: self.field(5),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreatedResponse {
    pub account: Account,
    pub redirect_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherCreatedResponse {
    pub account: TeacherProfile,
    pub redirect_url: String,
    pub is_teacher: bool,
    pub oauth2_url: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
}
