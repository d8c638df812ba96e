//! # Quantum-Chain Bridge Test Suite
//!
//! Cross-module flows for the bridge withdrawal subsystem.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── fixtures.rs          # FakeBridge: auth server, directory, witnesses
//! │   ├── withdrawal_flow.rs   # auth → quorum → encode → submit → confirm
//! │   ├── quorum_thresholds.rs # 17 / 18 / 25 witnesses, retry ceiling
//! │   └── auth_coalescing.rs   # concurrent logins, persisted sessions
//! └── benches/
//!     └── bridge_benchmarks.rs # ABI encoding and unit conversion
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qc-tests
//! cargo test -p qc-tests integration::quorum_thresholds
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod integration;
