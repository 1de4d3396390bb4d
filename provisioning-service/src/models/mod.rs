pub mod access_code;
pub mod account;
pub mod teacher;

pub use access_code::{AccessCodeRecord, CodeType};
pub use account::{Account, AccountType, ClassPeriod, SubLedger};
pub use teacher::{OAuthCredentials, Period, RosterEntry, Teacher, TeacherProfile};
