//! Orchestration of ledger, tally and audit: the only entry point that
//! mutates tallies.

mod vote_service;

pub use vote_service::*;
