//! Test helpers shared by the module test suites.

pub mod testutil;
