//! The vote ledger: one [`VoteRecord`] per current vote, at most one per
//! (session, voter).

mod vote_record;
mod voter_key;

pub use vote_record::*;
pub use voter_key::*;

#[cfg(test)]
mod voter_key_test;
