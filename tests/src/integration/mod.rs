//! # Integration Flows
//!
//! Every flow runs against [`fixtures::FakeBridge`] and a scripted wallet on
//! paused tokio time, so backoff and receipt polling cost nothing.

pub mod fixtures;

mod auth_coalescing;
mod quorum_thresholds;
mod withdrawal_flow;
