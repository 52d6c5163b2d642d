//! Growth model implementation.
//!
//! The model is a small set of pure functions so that loaders, the comparator,
//! and renderers can all share one definition of "predicted".

pub mod model;

pub use model::*;
