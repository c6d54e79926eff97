//! Monitoring Pipeline Module
//!
//! ## Tick Sequence
//!
//! ```text
//! Generator -> Classifier -> Alert Manager & History Store -> Insight Engine
//! ```
//!
//! [`Monitor`] runs one tick; [`Scheduler`] drives ticks on an interval and
//! serializes operator commands between them. Consumers only ever see
//! [`MonitorSnapshot`] copies.

mod coordinator;
mod registry;
mod state;
pub mod scheduler;

pub use coordinator::{Monitor, MonitorError, TickReport};
pub use registry::{MachineRegistry, RegistryError};
pub use scheduler::{CommandError, OperatorCommand, Scheduler, SchedulerHandle, SchedulerSummary};
pub use state::*;
