//! Polling engine
//!
//! A fixed-rate timer starts one cycle per period. Each cycle checks every
//! resolved metric concurrently on a bounded pool, applies the hysteresis
//! policy, and shortly afterwards decides whether the whole backend is down.

pub(crate) mod check;
pub mod engine;
pub mod hysteresis;
pub(crate) mod outage;
pub mod status;

pub use engine::{CycleReport, MetricPoller, PollerConfig};
pub use hysteresis::Transition;
pub use status::{StatusCategory, StatusLine};
