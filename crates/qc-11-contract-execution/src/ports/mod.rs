//! # Ports Layer (Middle Hexagon)
//!
//! Trait definitions for contract execution.
//! These are the interfaces between the domain and the outside world.
//!
//! - **Driving Ports (Inbound)**: `ContractExecutionApi`, `RegistryLoader`,
//!   `ContractExecutionServiceApi`
//! - **Driven Ports (Outbound)**: `Interpreter`, `ContractHost`,
//!   `StorageTransaction`, `ContractStore`, `KeyCrypto`, `PaymentGateway`
//! - No concrete implementations in this module

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
