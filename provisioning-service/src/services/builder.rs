//! Construction of freshly provisioned documents. No I/O happens here.

use crate::models::account::{
    DEFAULT_CURRENCY, DEFAULT_LOCALE, ROUTING_NUMBER, STARTING_GRADE,
};
use crate::models::{Account, AccountType, ClassPeriod, SubLedger, Teacher};
use crate::services::cipher::AccessCodeCipher;
use crate::services::error::ProvisioningError;
use crate::utils::hash_pin;
use mongodb::bson::oid::ObjectId;
use rand::Rng;
use service_core::error::AppError;

const ACCOUNT_NUMBER_MIN: u64 = 1_000_000_000_000_000;
const ACCOUNT_NUMBER_MAX: u64 = 9_999_999_999_999_999;

/// Personal fields submitted with a provisioning request.
#[derive(Debug, Clone)]
pub struct PersonalDetails {
    pub first_name: String,
    pub last_name: String,
    pub date: String,
    pub user_name: String,
    pub pin: String,
}

impl PersonalDetails {
    pub fn member_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Who a student account belongs to, as resolved from the access code.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub teacher: String,
    pub school: String,
    pub class_period: ClassPeriod,
}

/// Draw a 16-digit account number. Collisions are not checked.
pub fn draw_account_number<R: Rng>(rng: &mut R) -> String {
    rng.gen_range(ACCOUNT_NUMBER_MIN..=ACCOUNT_NUMBER_MAX)
        .to_string()
}

fn sub_ledger(
    account_type: AccountType,
    holder: &str,
    created: &str,
    account_number: String,
) -> SubLedger {
    SubLedger {
        routing_number: ROUTING_NUMBER,
        currency: DEFAULT_CURRENCY.to_string(),
        locale: DEFAULT_LOCALE.to_string(),
        created: created.to_string(),
        account_holder: holder.to_string(),
        balance_total: 0,
        bills: Vec::new(),
        payments: Vec::new(),
        account_type,
        account_number,
        movements_dates: Vec::new(),
        transactions: Vec::new(),
    }
}

/// Build a student account with independently drawn checking and savings numbers.
pub fn build_student_account(
    placement: &Placement,
    details: &PersonalDetails,
) -> Result<Account, ProvisioningError> {
    let pin: i64 = details
        .pin
        .trim()
        .parse()
        .map_err(|_| ProvisioningError::Validation("PIN must be numeric".to_string()))?;

    let member_name = details.member_name();
    let mut rng = rand::thread_rng();

    Ok(Account {
        member_name: member_name.clone(),
        pin,
        number_of_accounts: 2,
        teacher: placement.teacher.clone(),
        school: placement.school.clone(),
        class_period: placement.class_period.clone(),
        grade: STARTING_GRADE,
        lessons: 0,
        user_name: details.user_name.clone(),
        checking_account: sub_ledger(
            AccountType::Checking,
            &member_name,
            &details.date,
            draw_account_number(&mut rng),
        ),
        savings_account: sub_ledger(
            AccountType::Savings,
            &member_name,
            &details.date,
            draw_account_number(&mut rng),
        ),
    })
}

/// Build a teacher record for a teacher-type registry code.
///
/// The PIN is hashed one-way. The raw access code is encrypted reversibly so
/// that structured student codes can later be matched against it.
pub fn build_teacher(
    details: &PersonalDetails,
    school: &str,
    raw_access_code: &str,
    cipher: &AccessCodeCipher,
) -> Result<Teacher, ProvisioningError> {
    let pin = hash_pin(&details.pin).map_err(AppError::InternalError)?;
    let access_code = cipher
        .encrypt(raw_access_code)
        .map_err(|e| AppError::InternalError(anyhow::Error::new(e)))?;

    Ok(Teacher {
        id: ObjectId::new(),
        name: details.member_name(),
        access_code,
        username: details.user_name.clone(),
        pin,
        school: school.to_string(),
        periods: Vec::new(),
        oauth: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::verify_pin;
    use secrecy::Secret;

    fn details() -> PersonalDetails {
        PersonalDetails {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date: "2024-01-01".into(),
            user_name: "jdoe".into(),
            pin: "1234".into(),
        }
    }

    fn placement() -> Placement {
        Placement {
            teacher: "Ms. Frizzle".into(),
            school: "NMHS".into(),
            class_period: ClassPeriod::Number(2),
        }
    }

    #[test]
    fn student_account_has_expected_shape() {
        let account = build_student_account(&placement(), &details()).unwrap();

        assert_eq!(account.member_name, "Jane Doe");
        assert_eq!(account.pin, 1234);
        assert_eq!(account.number_of_accounts, 2);
        assert_eq!(account.grade, 100);
        assert_eq!(account.lessons, 0);
        assert_eq!(account.class_period, ClassPeriod::Number(2));
        assert_eq!(account.user_name, "jdoe");

        for (ledger, kind) in [
            (&account.checking_account, AccountType::Checking),
            (&account.savings_account, AccountType::Savings),
        ] {
            assert_eq!(ledger.account_type, kind);
            assert_eq!(ledger.routing_number, 141257185);
            assert_eq!(ledger.currency, "USD");
            assert_eq!(ledger.locale, "en-US");
            assert_eq!(ledger.created, "2024-01-01");
            assert_eq!(ledger.account_holder, "Jane Doe");
            assert_eq!(ledger.balance_total, 0);
            assert!(ledger.transactions.is_empty());
            assert_eq!(ledger.account_number.len(), 16);
            assert!(ledger.account_number.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn account_serializes_with_camel_case_fields() {
        let account = build_student_account(&placement(), &details()).unwrap();
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["memberName"], "Jane Doe");
        assert_eq!(json["classPeriod"], 2);
        assert_eq!(json["checkingAccount"]["accountType"], "Checking");
        assert_eq!(json["savingsAccount"]["balanceTotal"], 0);
        assert!(json["savingsAccount"]["movementsDates"].is_array());
    }

    #[test]
    fn non_numeric_pin_is_rejected() {
        let mut d = details();
        d.pin = "12a4".into();
        assert!(matches!(
            build_student_account(&placement(), &d),
            Err(ProvisioningError::Validation(_))
        ));
    }

    #[test]
    fn account_numbers_stay_in_sixteen_digit_space() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let n = draw_account_number(&mut rng);
            assert_eq!(n.len(), 16);
            assert_ne!(n.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn teacher_record_hides_pin_and_encrypts_code() {
        let cipher = AccessCodeCipher::new(&Secret::new("changeme!".to_string()));
        let teacher = build_teacher(&details(), "NMHS", "TEACH-0001", &cipher).unwrap();

        assert_eq!(teacher.name, "Jane Doe");
        assert_eq!(teacher.username, "jdoe");
        assert_eq!(teacher.school, "NMHS");
        assert!(teacher.periods.is_empty());
        assert_ne!(teacher.access_code, "TEACH-0001");
        assert_eq!(cipher.decrypt(&teacher.access_code).unwrap(), "TEACH-0001");
        assert_ne!(teacher.pin, "1234");
        assert!(verify_pin("1234", &teacher.pin));
    }
}
