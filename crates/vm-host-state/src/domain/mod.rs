//! # Domain Layer (Inner Hexagon)
//!
//! Pure data types for host-side contract execution.
//! NO I/O, NO collaborators.
//!
//! - This is the **inner layer** of the hexagonal architecture.
//! - Dependencies point INWARD only (host and adapters depend on this, not vice versa).

pub mod entities;
pub mod invariants;
pub mod value_objects;

pub use entities::*;
pub use invariants::*;
pub use value_objects::*;
