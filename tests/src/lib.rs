//! # VM Host State Test Suite
//!
//! Workspace test crate driving whole transactions through the execution
//! service with in-memory collaborators.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs         # World, executor and tracing setup
//!     ├── storage_flows.rs    # Staged writes, statuses and gas
//!     ├── nested_calls.rs     # Same/different context calls, recursion, depth
//!     └── transactions.rs     # Query, deploy, transfer, logs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p vm-host-tests
//!
//! # With host logs
//! RUST_LOG=vm_host_state=debug cargo test -p vm-host-tests -- --nocapture
//! ```

#![allow(dead_code)]

pub mod integration;
