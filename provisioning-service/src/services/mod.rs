pub mod broadcast;
pub mod builder;
pub mod cipher;
pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod oauth;
pub mod replication;
pub mod resolver;
pub mod store;

pub use broadcast::{EventBroadcaster, ProvisioningEvent};
pub use builder::PersonalDetails;
pub use cipher::{AccessCodeCipher, CipherError};
pub use coordinator::{ProvisioningCoordinator, ProvisioningResult, RosterSlot};
pub use error::ProvisioningError;
pub use metrics::{get_metrics, init_metrics};
pub use oauth::{AuthorizationCodeExchange, GoogleOAuthClient, TokenSet};
pub use replication::{HttpPeerReplicator, PeerReplicator, ReplicationAck, ReplicationOutcome};
pub use resolver::{AccessCodeResolver, Resolution};
pub use store::{InMemoryStore, MongoStore, ProvisioningStore};
