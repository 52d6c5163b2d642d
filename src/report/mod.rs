//! Reporting utilities: observation comparison, summaries, and terminal formatting.

pub mod compare;
pub mod format;

pub use compare::*;
pub use format::*;
