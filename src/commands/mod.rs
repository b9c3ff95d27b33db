//! Command registry and built-in command bodies
//!
//! Commands are looked up by name from `<%NAME:args%>` markers. Built-ins are
//! a closed [`Builtin`] enum; anything else can be added at runtime through
//! [`CommandRegistry::register`].
//!
//! # Example
//!
//! ```ignore
//! use smartblocks::commands::{Command, CommandOutput, CommandRegistry, SyncHandler};
//!
//! let mut registry = CommandRegistry::with_builtins();
//! registry.register(Command::new(
//!     "SHOUT",
//!     SyncHandler(|_ctx, args: Vec<String>| Ok(CommandOutput::Text(args.join(" ").to_uppercase()))),
//! ));
//! ```

mod builtin;
mod dates;
mod interaction;
mod layout;
mod logic;
mod queries;
mod registry;
mod variables;

pub use builtin::Builtin;
#[allow(unused_imports)]
pub use dates::{format_date, parse_date, parse_roam_title, roam_title};
#[allow(unused_imports)]
pub use registry::{Command, CommandHandler, CommandOutput, CommandRegistry, SyncHandler};

use crate::node::Node;
use crate::workflow::Expansion;

/// Positional argument, or empty when absent
pub(crate) fn arg(args: &[String], index: usize) -> &str {
    args.get(index).map(String::as_str).unwrap_or("")
}

/// Turn an expansion back into blocks: its own text and children first,
/// then any extra blocks it produced
pub(crate) fn expansion_nodes(expansion: Expansion) -> Vec<Node> {
    let mut nodes = vec![Node::text(expansion.text).with_children(expansion.children)];
    nodes.extend(expansion.next_blocks);
    nodes
}
