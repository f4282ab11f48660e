//! Host for `bandcamp-core`: argument parsing, HTTP execution and output.
//!
//! The `bandcamp` binary (`src/main.rs`) is a thin wrapper around
//! `commands::run`; the library exists so the commands can be driven from
//! integration tests with a captured output buffer.

pub mod cli;
pub mod commands;
pub mod config;
pub mod executor;
pub mod output;
pub mod progress;
