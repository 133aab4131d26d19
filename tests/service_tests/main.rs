//! Service test target
