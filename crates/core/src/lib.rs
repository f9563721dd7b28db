//! The scheduler core: event bus, scan plan, and orchestrator. See
//! `SPEC_FULL.md` §4.5, §4.6, §4.11.

pub mod events;
pub mod orchestrator;
pub mod plan;

pub use events::{AsyncSubscriber, EventBus, SubscriptionId, SyncSubscriber};
pub use orchestrator::{Orchestrator, OrchestratorHandle};
pub use plan::ScanPlan;
