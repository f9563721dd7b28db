//! Tool adapter contract, the shared streaming execution engine, the
//! registry, and fifteen concrete adapters wrapping real reconnaissance
//! binaries.

pub mod adapters;
pub mod contract;
pub mod engine;
pub mod registry;

pub use contract::{ScanOptions, ToolAdapter, ToolCategory, ToolConfig, ToolResult};
pub use engine::{execute, ToolResultStream};
pub use registry::ToolRegistry;
