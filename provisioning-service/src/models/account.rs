//! Student account document stored in the `User Profiles` collection.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ROUTING_NUMBER: u32 = 141257185;
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LOCALE: &str = "en-US";
pub const STARTING_GRADE: u32 = 100;

/// Class period as it appears on an account.
///
/// Structured codes carry a numeric period segment; registry codes carry
/// whatever the registry record holds, which is not always numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassPeriod {
    Number(i64),
    Label(String),
}

impl ClassPeriod {
    /// Parse a period segment, keeping the raw text when it is not numeric.
    pub fn from_segment(segment: &str) -> Self {
        segment
            .trim()
            .parse::<i64>()
            .map(ClassPeriod::Number)
            .unwrap_or_else(|_| ClassPeriod::Label(segment.to_string()))
    }
}

impl Default for ClassPeriod {
    fn default() -> Self {
        ClassPeriod::Label(String::new())
    }
}

impl fmt::Display for ClassPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassPeriod::Number(n) => write!(f, "{}", n),
            ClassPeriod::Label(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Checking,
    Savings,
}

/// One of the two financial accounts embedded in every student account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubLedger {
    pub routing_number: u32,
    pub currency: String,
    pub locale: String,
    pub created: String,
    pub account_holder: String,
    pub balance_total: i64,
    #[serde(default)]
    pub bills: Vec<serde_json::Value>,
    #[serde(default)]
    pub payments: Vec<serde_json::Value>,
    pub account_type: AccountType,
    /// 16-digit numeric string.
    pub account_number: String,
    #[serde(default)]
    pub movements_dates: Vec<serde_json::Value>,
    #[serde(default)]
    pub transactions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub member_name: String,
    pub pin: i64,
    pub number_of_accounts: u32,
    pub teacher: String,
    pub school: String,
    pub class_period: ClassPeriod,
    pub grade: u32,
    pub lessons: u32,
    pub user_name: String,
    pub checking_account: SubLedger,
    pub savings_account: SubLedger,
}
