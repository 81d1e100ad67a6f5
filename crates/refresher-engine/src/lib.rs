//! Refresher Engine
//!
//! The engine crate holds the runtime side of the settings sync:
//! - arms and re-arms the periodic page effector ([`Scheduler`])
//! - announces persisted settings to other contexts ([`ChangeBroadcaster`])
//! - runs the page agent that follows those announcements ([`Agent`])
//!
//! [`test_support`] exposes helpers shared by the test suites.

mod agent;
mod broadcast;
mod scheduler;
pub mod test_support;
mod ticker;

pub use agent::Agent;
pub use broadcast::ChangeBroadcaster;
pub use scheduler::{Effector, MIN_PERIOD_MS, Scheduler, SchedulerState, period_for};
