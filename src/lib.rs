//! tournoi-signup - signup URL resolution for table-tennis tournaments.
//!
//! Core library: candidate discovery and ranking, page validation, bounded
//! crawling and the concurrent batch that ties them together.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod discovery;
pub mod documents;
pub mod error;
pub mod models;
pub mod platform;
pub mod ranking;
pub mod repository;
pub mod retry;
pub mod season;
pub mod services;
pub mod skip_list;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod testing;
