//! # Adapters Layer (Outer Hexagon)
//!
//! Concrete implementations of the outbound ports.
//!
//! - `InMemoryWorld`: `BlockchainLookup` over in-memory accounts and storage
//! - `ScriptedExecutor`: `ContractExecutor` running Rust closures as contracts

pub mod scripted;
pub mod world;

pub use scripted::*;
pub use world::*;
