// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for working with a dataset from the terminal.
//!
//! This module contains the command-line interface logic, including argument parsing,
//! terminal output and the `info`, `label` and `show` commands.

// Modules
/// CLI arguments.
pub mod args;

/// Command implementations.
pub mod commands;

/// Terminal output macros.
pub mod logging;
