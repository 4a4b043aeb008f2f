//! # Adapters Layer (Outer Hexagon)
//!
//! Reference implementations of the driven ports.
//!
//! - `script_vm`: line-oriented contract language (`Interpreter`)
//! - `memory_store`: savepoint-aware in-memory tables (`StorageProvider`)
//! - `crypto`: secp256k1 keys with Keccak-256 key ids (`KeyCrypto`)
//! - `payment`: flat-rate fees (`PaymentGateway`)

pub mod crypto;
pub mod memory_store;
pub mod payment;
pub mod script_vm;

pub use crypto::*;
pub use memory_store::*;
pub use payment::*;
pub use script_vm::*;
