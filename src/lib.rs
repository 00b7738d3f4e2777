//! Hostpulse, a lightweight host telemetry agent.
//!
//! This library exposes the core modules for use by the binary and by tests.

pub mod collectors;
pub mod config;
pub mod controller;
pub mod error;
pub mod hub;
pub mod logging;
pub mod model;
pub mod poll;
pub mod server;

pub use error::{Error, Result};
