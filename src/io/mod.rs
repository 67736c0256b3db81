//! Input/Output handling for CLI integration.
//!
//! This module provides consistent exit codes for scripts and automation
//! wrapping the CLI.

pub mod exit_code;

pub use exit_code::ExitCode;
