//! Service layer: the resolution pipeline and the batch orchestrator.
//!
//! Services emit events and reports; presentation is left to the caller.

pub mod orchestrator;
pub mod resolver;

pub use orchestrator::{
    BatchError, BatchReport, Orchestrator, OrchestratorConfig, ResolveEvent, TournamentReport,
};
pub use resolver::{ResolverLimits, TournamentResolver};
