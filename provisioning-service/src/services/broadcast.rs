//! Fan-out of provisioning notifications to connected subscribers.
//!
//! Delivery is fire-and-forget: publishing with nobody listening is not an
//! error, and slow subscribers that lag past the channel capacity lose events.

use crate::models::{Account, ClassPeriod};
use serde::Serialize;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Modal shown to the user when an access code is refused.
pub const CODE_REJECTED_MODAL: &str = r##"<dialog open class="baseModal">
<h1>Invalid or Used Access Code</h1>
<h1>Please Contact Admin</h1>
<button><a href="#" class="buttonClass">Close</a></button>
</dialog>"##;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAdded {
    pub member_name: String,
    pub class_period: ClassPeriod,
    pub checking_balance: i64,
    pub savings_balance: i64,
    pub grade: u32,
    pub lessons_completed: u32,
}

impl From<&Account> for StudentAdded {
    fn from(account: &Account) -> Self {
        Self {
            member_name: account.member_name.clone(),
            class_period: account.class_period.clone(),
            checking_balance: account.checking_account.balance_total,
            savings_balance: account.savings_account.balance_total,
            grade: account.grade,
            lessons_completed: account.lessons,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationSuccessful {
    pub account: Account,
    pub redirect_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProvisioningEvent {
    /// Presentational payload for a refused access code.
    CodeRejected(String),
    StudentAdded(StudentAdded),
    CreationSuccessful(Box<CreationSuccessful>),
}

impl ProvisioningEvent {
    pub fn code_rejected() -> Self {
        ProvisioningEvent::CodeRejected(CODE_REJECTED_MODAL.to_string())
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProvisioningEvent::CodeRejected(_) => "noSchoolCodeFound",
            ProvisioningEvent::StudentAdded(_) => "studentAdded",
            ProvisioningEvent::CreationSuccessful(_) => "creationSuccessful",
        }
    }

    pub fn payload(&self) -> Result<String, serde_json::Error> {
        match self {
            ProvisioningEvent::CodeRejected(modal) => serde_json::to_string(modal),
            ProvisioningEvent::StudentAdded(added) => serde_json::to_string(added),
            ProvisioningEvent::CreationSuccessful(created) => serde_json::to_string(created),
        }
    }
}

#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ProvisioningEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProvisioningEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn publish(&self, event: ProvisioningEvent) {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!(event = name, receivers, "Broadcast event"),
            Err(_) => tracing::debug!(event = name, "Broadcast event with no subscribers"),
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
