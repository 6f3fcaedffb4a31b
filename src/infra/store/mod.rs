//! Alarm-store backends.

pub mod memory;

pub use memory::InMemoryAlarmStore;
