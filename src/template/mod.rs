//! Macro language front end
//!
//! Block text embeds command markers that the workflow engine expands:
//!
//! - Commands: `<%DATE%>`, `<%SET:mood,happy%>`
//! - Nesting: `<%IFVAR:mood,<%GET:expected%>%>`
//! - Escaped commas: `<%SET:list,a\,b%>` sets `list` to `a,b`
//! - Unknown commands round-trip verbatim; unterminated markers stay literal
//!
//! # Example
//!
//! ```ignore
//! use smartblocks::template::{Token, split_args, tokenize};
//!
//! let tokens = tokenize("Due <%DATE:in 3 days%>");
//! assert_eq!(tokens[1], Token::Command("DATE:in 3 days".into()));
//!
//! let args = split_args("one,<%RANDOMNUMBER:1,10%>,two");
//! assert_eq!(args.len(), 3);
//! ```

mod args;
mod conditionals;
mod errors;
mod tokenizer;

pub use args::{ArgPolicy, split_args};
pub use conditionals::evaluate_condition;
pub use errors::{CommandError, TemplateError, suggest_correction};
pub use tokenizer::{Token, tokenize};
