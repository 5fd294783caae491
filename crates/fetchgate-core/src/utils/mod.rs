//! Utility functions.

pub mod paths;
