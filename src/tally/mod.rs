//! Per-session option counts and the one pure function that changes them.

mod aggregator;

pub use aggregator::*;

#[cfg(test)]
mod aggregator_test;
