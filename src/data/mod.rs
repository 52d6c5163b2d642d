//! Demo data.

pub mod sample;

pub use sample::{SampleConfig, generate_observations};
