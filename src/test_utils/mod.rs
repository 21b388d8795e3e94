//! the test_utils folder here shares fixtures and mocks between the unit
//! tests of every module
mod common;
mod mock;

pub(crate) use common::*;
pub(crate) use mock::*;
