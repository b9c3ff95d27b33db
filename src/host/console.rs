//! Terminal host used by the CLI

use super::{Navigator, Notifier, PromptRequest, Prompter, Scheduler};
use async_trait::async_trait;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Prompts on stdin and reports on stderr
#[derive(Debug, Default)]
pub struct ConsoleHost {
    /// Answer every prompt with its default instead of reading stdin
    pub non_interactive: bool,
}

impl ConsoleHost {
    pub fn new(non_interactive: bool) -> Self {
        Self { non_interactive }
    }
}

#[async_trait]
impl Prompter for ConsoleHost {
    async fn prompt(&self, request: PromptRequest) -> Option<String> {
        if self.non_interactive {
            return Some(request.default);
        }

        let mut stderr = std::io::stderr();
        let _ = write!(stderr, "{}", request.label);
        if !request.options.is_empty() {
            let _ = write!(stderr, " [{}]", request.options.join(" / "));
        }
        if !request.default.is_empty() {
            let _ = write!(stderr, " ({})", request.default);
        }
        let _ = write!(stderr, ": ");
        let _ = stderr.flush();

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            // EOF means the user closed the prompt
            Ok(0) => None,
            Ok(_) => {
                let answer = line.trim_end_matches(['\r', '\n']);
                if answer.is_empty() {
                    Some(request.default)
                } else {
                    Some(answer.to_string())
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read prompt answer");
                None
            }
        }
    }
}

impl Notifier for ConsoleHost {
    fn notify(&self, message: &str, _seconds: u64) {
        eprintln!("» {}", message);
    }

    fn report_error(&self, message: &str, context: &str) {
        tracing::error!(context = context, "{}", message);
    }
}

#[async_trait]
impl Navigator for ConsoleHost {
    async fn open_block(&self, uid: &str) {
        tracing::info!(uid = uid, "Focus block");
    }

    async fn open_page(&self, title: &str) {
        tracing::info!(title = title, "Open page");
    }

    async fn set_cursor(&self, uid: &str, offset: usize) {
        tracing::info!(uid = uid, offset, "Cursor");
    }

    async fn blur(&self) {
        tracing::debug!("Blur");
    }
}

impl Scheduler for ConsoleHost {
    fn recurring_ran(&self, workflow: &str) {
        tracing::info!(workflow = workflow, "Recurring workflow ran; next run rescheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_non_interactive_uses_default() {
        let host = ConsoleHost::new(true);
        let answer = host
            .prompt(PromptRequest {
                label: "Mood?".into(),
                default: "fine".into(),
                options: vec![],
            })
            .await;
        assert_eq!(answer.as_deref(), Some("fine"));
    }
}
