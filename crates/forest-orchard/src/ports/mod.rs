//! # Ports Layer
//!
//! Port traits of the orchard.
//!
//! ## Hexagonal Architecture
//!
//! - `inbound.rs` - Driving ports (the store API offered to callers)
//! - `outbound.rs` - Driven ports (the codec the engine relies on)

pub mod inbound;
pub mod outbound;
