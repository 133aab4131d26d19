//! Store test target

mod memory_tests;
