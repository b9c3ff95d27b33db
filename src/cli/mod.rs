//! CLI module for smartblocks
//!
//! This module provides:
//! - Command implementations (run, workflows, validate, commands, show, history)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use smartblocks::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console);
//! let exit_code = commands::run_workflow(&runner, request, &*handler).await;
//! ```

pub mod commands;
pub mod output;

pub use commands::{
    list_commands, list_workflows, parse_variables, resolve_target, run_workflow, show_history,
    show_page, validate_workflow,
};
#[allow(unused_imports)]
pub use output::{OutputEvent, OutputHandler, OutputMode, create_handler};
