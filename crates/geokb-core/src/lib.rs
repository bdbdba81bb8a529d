//! Configuration and wiring for GeoKB.

pub mod bootstrap;
pub mod config;

pub use config::Config;
