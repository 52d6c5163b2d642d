//! `growth-curves` library crate.
//!
//! The binary (`growth`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the CLI commands and the TUI share one load/evaluate/compare path

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod models;
pub mod plot;
pub mod report;
pub mod session;
pub mod tui;
