//! Command-line interface for tournoi-signup.

mod commands;

pub use commands::{is_verbose, run};
