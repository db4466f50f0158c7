//! Data models for the resolution engine.

mod candidate;
mod outcome;
mod tournament;

pub use candidate::{CandidateSet, CandidateUrl, OriginSignal};
pub use outcome::{ConfidenceSignals, ResolutionOutcome, ValidationOutcome};
pub use tournament::{TournamentRecord, TournamentTarget};

#[cfg(test)]
pub(crate) use tournament::sample_target;
