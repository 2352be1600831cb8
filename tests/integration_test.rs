mod common;
mod concurrent_votes;
mod persistence;
