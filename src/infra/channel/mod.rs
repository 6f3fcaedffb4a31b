//! Delivery-channel backends.

pub mod memory;

pub use memory::InMemoryChannel;
