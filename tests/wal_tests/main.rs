//! Transaction log test target

mod recovery_tests;
