//! Keep-alive output primitives.

pub mod noop;
pub mod simulated;

pub use noop::NoopOutput;
pub use simulated::SimulatedOutput;
