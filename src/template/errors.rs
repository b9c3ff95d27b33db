//! Engine error types with name suggestions

use crate::store::StoreError;
use thiserror::Error;

/// Errors raised while expanding block text
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A command handler failed
    #[error("command '{command}' failed: {source}")]
    Command {
        command: String,
        #[source]
        source: CommandError,
    },

    /// A sub-workflow was requested that does not exist
    #[error("workflow '{name}' not found{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    UnknownWorkflow {
        name: String,
        suggestion: Option<String>,
    },

    /// Document store failure outside of a command
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl TemplateError {
    /// Wrap a handler error with the name of the command that raised it
    pub fn command(command: impl Into<String>, source: CommandError) -> Self {
        Self::Command {
            command: command.into(),
            source,
        }
    }

    /// True when the failure traces back to a dismissed prompt
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Command { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// Create an unknown workflow error with an optional suggestion
    pub fn unknown_workflow(name: impl Into<String>, known: &[&str]) -> Self {
        let name = name.into();
        let suggestion = suggest_correction(&name, known);
        Self::UnknownWorkflow { name, suggestion }
    }
}

/// Errors a command handler can return
#[derive(Debug, Error)]
pub enum CommandError {
    /// An argument could not be interpreted
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Expression evaluation failed
    #[error("expression error: {message}")]
    Expression { message: String },

    /// The user dismissed a prompt
    #[error("prompt '{label}' was cancelled")]
    PromptCancelled { label: String },

    /// Document store failure
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Nested expansion failed
    #[error(transparent)]
    Template(#[from] Box<TemplateError>),
}

impl CommandError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn expression(message: impl Into<String>) -> Self {
        Self::Expression {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::PromptCancelled { .. } => true,
            Self::Template(inner) => inner.is_cancelled(),
            _ => false,
        }
    }
}

impl From<TemplateError> for CommandError {
    fn from(err: TemplateError) -> Self {
        Self::Template(Box::new(err))
    }
}

/// Suggest a correction for a typo using Levenshtein distance
pub fn suggest_correction(typo: &str, candidates: &[&str]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }

    let mut best_match = None;
    let mut best_distance = usize::MAX;
    let max_distance = (typo.len() / 2).max(2);

    for candidate in candidates {
        let distance = levenshtein_distance(&typo.to_lowercase(), &candidate.to_lowercase());
        if distance < best_distance && distance <= max_distance {
            best_distance = distance;
            best_match = Some(candidate.to_string());
        }
    }

    best_match
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rolling rows instead of the full matrix
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0usize; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}
