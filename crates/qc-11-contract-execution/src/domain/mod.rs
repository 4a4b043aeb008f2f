//! # Domain Layer (Inner Hexagon)
//!
//! Pure business logic for contract execution.
//! NO I/O, NO async.
//!
//! - This is the **inner layer** of the hexagonal architecture.
//! - Dependencies point INWARD only (adapters depend on this, not vice versa).

pub mod call_stack;
pub mod context;
pub mod entities;
pub mod environment;
pub mod fuel;
pub mod invariants;
pub mod services;
pub mod value_objects;

pub use call_stack::*;
pub use context::*;
pub use entities::*;
pub use environment::*;
pub use fuel::*;
pub use invariants::*;
pub use services::*;
pub use value_objects::*;
