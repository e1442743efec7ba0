//! Output formatting module.

pub mod report;

pub use report::*;
