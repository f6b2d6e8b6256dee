//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for host-side contract execution.
//! These are the interfaces between the host and the outside world.
//!
//! - **Driving Ports (Inbound)**: `TransactionApi`
//! - **Driven Ports (Outbound)**: `BlockchainLookup`, `Metering`, `ContractExecutor`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
