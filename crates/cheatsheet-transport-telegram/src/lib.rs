#![deny(missing_docs)]
//! Telegram webhook transport for the cheatsheet bot.

/// Telegram transport configuration.
pub mod config;
/// Outbound Bot API operations.
pub mod gateway;
/// Media group notification ledger.
pub mod ledger;
/// User-facing reply texts.
pub mod messages;
/// Per-message response flow.
pub mod orchestrator;
/// Webhook runtime entrypoint.
pub mod runner;
/// Inbound update model and classification.
pub mod update;
/// Webhook HTTP routes.
pub mod webhook;
