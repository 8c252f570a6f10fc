//! radwatch - FreeRADIUS status monitor
//!
//! Polls FreeRADIUS status servers through radclient and reports their
//! counters, response time and health to a metrics sink.

pub mod check;
pub mod config;
pub mod metrics;
pub mod probe;
pub mod scheduler;
pub mod sink;
