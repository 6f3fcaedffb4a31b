//! Configuration models for quota, health monitoring, keep-alive, and timeouts.

pub mod service;

pub use service::{HealthConfig, KeepAliveConfig, QuotaConfig, ServiceConfig};
