//! HTTP handlers for provisioning-service.

pub mod events;
pub mod health;
pub mod oauth;
pub mod provisioning;
pub mod replication;
