//! # Alarm Lot
//!
//! Capacity-aware alarm scheduling over a quota-limited notification
//! channel, with a supervised background keep-alive.
//!
//! The delivery channel holds at most 64 pending entries shared with other
//! producers. Four are reserved for them; the remaining 60 are the alarm
//! budget. Recurring alarms want one entry per weekday, so a full alarm list
//! can easily ask for more than the budget allows.
//!
//! ## Key Features
//!
//! - **Priority scheduling**: alarms are walked soonest-first and the tail is
//!   skipped once the budget runs out, with every skip reported
//! - **Fair share**: recurring alarms split the remaining slots evenly,
//!   soonest weekdays first
//! - **All-or-nothing registration**: a recurring alarm that fails partway is
//!   rolled back before the failure is reported
//! - **Keep-alive engine**: a near-silent output loop keeps the process
//!   resident while alarms are pending
//! - **Health monitor**: periodic checks restart a stalled keep-alive, gated
//!   by a circuit breaker so a broken output is not hammered
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use alarm_lot::builders::build_service;
//! use alarm_lot::config::ServiceConfig;
//! use alarm_lot::infra::{InMemoryAlarmStore, InMemoryChannel, SimulatedOutput};
//! use alarm_lot::runtime::TokioSpawner;
//! use alarm_lot::util::SystemClock;
//!
//! let cfg = ServiceConfig::from_env()?;
//! let clock = Arc::new(SystemClock);
//! let store = Arc::new(InMemoryAlarmStore::new(clock.clone()));
//! let channel = Arc::new(InMemoryChannel::new(cfg.quota.max_total));
//! let service = build_service(
//!     &cfg,
//!     store,
//!     channel,
//!     Arc::new(SimulatedOutput::new()),
//!     clock,
//!     TokioSpawner::current()?,
//!     None,
//! )?;
//!
//! let report = service.schedule_all().await?;
//! service.on_enter_background().await;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling, keep-alive, and health-monitoring logic.
pub mod core;
/// Configuration models for quota, health timing, and keep-alive.
pub mod config;
/// Builders to construct the service from configuration.
pub mod builders;
/// Infrastructure adapters for the channel, alarm store, and output.
pub mod infra;
/// Runtime adapters and the service facade.
pub mod runtime;
/// Shared utilities.
pub mod util;
