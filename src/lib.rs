//! Phone + password credentials for an event-sourced identity system.
//!
//! Workflows in [`workflows`] decide against the phonePassword read model and
//! hand their effects to the [`routing::EventRouter`], which commits the
//! phonePassword batch first and then fans out to users, session and sms.

pub mod clock;
pub mod config;
pub mod domain;
pub mod errors;
pub mod event_sourcing;
pub mod metrics;
pub mod projections;
pub mod routing;
pub mod runtime;
pub mod triggers;
pub mod workflows;
