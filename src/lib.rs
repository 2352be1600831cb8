//! Transactional vote ledger and tally engine.
//!
//! A [`VoteService`] records at most one vote per (session, voter) and keeps
//! every session's tally equal to the count of its current votes, under any
//! number of concurrent writers. State lives in a [`DocumentStore`]; every
//! mutation is an optimistic transaction on the session document and every
//! vote mutation leaves an entry in the audit trail.

mod audit;
mod config;
mod constants;
mod errors;
mod ledger;
mod metrics;
mod service;
mod session;
mod storage;
mod tally;
pub mod utils;

pub use audit::*;
pub use config::*;
pub use errors::*;
pub use ledger::*;
pub use metrics::*;
pub use service::*;
pub use session::*;
pub use storage::*;
pub use tally::*;
pub use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
//-----------------------------------------------------------
// Autometrics
/// autometrics: https://docs.autometrics.dev/rust/adding-alerts-and-slos
use autometrics::objectives::Objective;
use autometrics::objectives::ObjectiveLatency;
use autometrics::objectives::ObjectivePercentile;
const API_SLO: Objective = Objective::new("api")
    .success_rate(ObjectivePercentile::P99_9)
    .latency(ObjectiveLatency::Ms10, ObjectivePercentile::P99);
