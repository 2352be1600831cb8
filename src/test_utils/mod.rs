//! the test_utils folder here will share fixtures between the unit tests of
//! every module
mod common;
mod session_builder;

pub(crate) use common::*;
pub(crate) use session_builder::*;
