//! AgriSense - soil-sensor telemetry API with agronomic recommendations
//!
//! This library exposes the core modules for testing and reuse.

pub mod analytics;
pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod inference;
pub mod ingest;
pub mod routes;
pub mod services;
pub mod weather;
