//! Workflow execution engine for smartblocks
//!
//! This module handles:
//! - Per-run execution context and nested-run scoping
//! - Block-text expansion and command dispatch
//! - Tree building with exit, indent and unindent rules
//! - Block reference rewriting
//! - Workflow lookup and persistence of generated blocks
//!
//! # Example
//!
//! ```ignore
//! use smartblocks::workflow::{RunRequest, Target, WorkflowRef, WorkflowRunner};
//!
//! let runner = WorkflowRunner::new(services);
//! let page = services.store.create_page("October 19th, 2026").await?;
//! let outcome = runner
//!     .run(RunRequest::new(WorkflowRef::Name("Morning".into()), Target::Page(page)))
//!     .await?;
//!
//! println!("Generated {} blocks", outcome.nodes.len());
//! ```

mod builder;
mod context;
mod executor;
mod library;
mod resolver;
mod runner;

#[allow(unused_imports)]
pub use builder::{BuiltLevel, Intro};
#[allow(unused_imports)]
pub use context::{AfterRunEffect, CursorPosition, ExecutionContext, ExitBlock, IndentDirective};
#[allow(unused_imports)]
pub use executor::{BoxFuture, Expansion, Interpreter, Services};
#[allow(unused_imports)]
pub use library::{WorkflowLibrary, WorkflowOrigin, WorkflowRef, WorkflowSource};
#[allow(unused_imports)]
pub use resolver::resolve_refs;
#[allow(unused_imports)]
pub use runner::{
    CursorMode, MAX_NESTING, RunOutcome, RunRequest, Target, WorkflowError, WorkflowRunner,
};

#[cfg(test)]
pub(crate) use executor::testing;
