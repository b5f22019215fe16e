//! AeroGuard CLI - operator tools for the risk service.
//!
//! Binaries:
//! - send_scenario: posts preset telemetry to a running server
//! - evaluate: scores a recorded telemetry file offline

pub mod client;
pub mod offline;
pub mod scenarios;

pub use client::{IngestReply, RiskClient};
pub use offline::{Evaluation, EvaluationInput};
pub use scenarios::Scenario;
