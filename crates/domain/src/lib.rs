//! Data model, error type, and scan configuration shared by every recon crate.

pub mod config;
pub mod error;
pub mod models;

pub use config::{Config, ScanConfig, ScanMode};
pub use error::{Error, Result};
pub use models::{
    Asset, Event, EventType, Finding, Metadata, ScanSession, Severity, Task, TaskStatus,
};
