//! Raid log analysis for vanilla/TBC WoW servers.
//!
//! The threat pipeline reads TWThreat snapshot part-files, splits them into
//! fights, aggregates per-player threat and labels roles from combat-log
//! signals. Smaller tools cut combat logs down to one raid and chart
//! consumable spending.

pub mod consumes;
pub mod error;
pub mod log_filter;
pub mod logfile;
pub mod models;
pub mod parser;
pub mod raids;
pub mod render;
pub mod roles;
pub mod segmenter;
pub mod settings;
pub mod signals;
pub mod stats;

pub use error::{Error, Result};
