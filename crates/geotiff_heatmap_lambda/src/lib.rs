//! AWS-oriented adapters and handlers for GeoTIFF heatmap conversion.
//!
//! This crate owns runtime integration details (Lambda entry point, object
//! storage adapters and log setup). The conversion domain itself lives in
//! `geotiff_heatmap_core`.

pub mod adapters;
pub mod handlers;
pub mod telemetry;
