//! Decision oracle adapter.
//!
//! Formats a bounded window of violation events into a consultation,
//! invokes the advisory oracle over a pluggable transport, and resolves
//! its free-text reply into a strict decision. Transport failures degrade
//! to `IGNORE` — the system fails open on oracle outage.

pub mod client;
pub mod reply;

pub use client::{DecisionOracle, HttpOracleClient, OracleClient, OracleConfig};
pub use reply::{normalize_reply, parse_decision};
