//! # Contract Execution Test Suite
//!
//! Unified test crate for the contract execution subsystem.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/      # End-to-end flows through the async service
//!     ├── mod.rs        # Shared harness: seeded storage, signer, service
//!     └── flows.rs      # Commit, fee-charged, rejected and limit flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qc-tests
//!
//! # Benchmarks
//! cargo bench -p qc-tests
//! ```

#![allow(dead_code)]

pub mod integration;
