//! Serializer Adapters
//!
//! Implementations of the `NodeCodec` port.

mod bincode;

pub use self::bincode::BincodeNodeCodec;
