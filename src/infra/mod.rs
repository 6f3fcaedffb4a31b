//! Infrastructure adapters for the delivery channel, alarm store, and
//! keep-alive output.

pub mod channel;
pub mod output;
pub mod store;

pub use channel::InMemoryChannel;
pub use output::{NoopOutput, SimulatedOutput};
pub use store::InMemoryAlarmStore;
