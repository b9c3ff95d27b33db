//! Host collaborators: prompts, notifications, navigation and scheduling
//!
//! The engine never talks to a UI directly. Commands that need the user go
//! through [`Prompter`], post-run positioning goes through [`Navigator`], and
//! toasts and warnings go through [`Notifier`].

mod console;

pub use console::ConsoleHost;

use async_trait::async_trait;
use std::sync::Arc;

/// A question for the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromptRequest {
    pub label: String,
    pub default: String,
    pub options: Vec<String>,
}

/// Asks the user for input
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Returns `None` when the user cancels
    async fn prompt(&self, request: PromptRequest) -> Option<String>;
}

/// Fire-and-forget messages
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, seconds: u64);

    /// Best-effort error telemetry; failures are swallowed
    fn report_error(&self, _message: &str, _context: &str) {}
}

/// Moves focus around the host document
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn open_block(&self, uid: &str);
    async fn open_page(&self, title: &str);
    async fn set_cursor(&self, uid: &str, offset: usize);
    async fn blur(&self);
}

/// Notified when a run matches the configured recurring workflow
pub trait Scheduler: Send + Sync {
    fn recurring_ran(&self, workflow: &str);
}

/// Every collaborator the engine needs from its host
#[derive(Clone)]
pub struct Host {
    pub prompter: Arc<dyn Prompter>,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub scheduler: Arc<dyn Scheduler>,
}

impl Host {
    /// Use one value for every role
    pub fn from_shared<T>(host: Arc<T>) -> Self
    where
        T: Prompter + Notifier + Navigator + Scheduler + 'static,
    {
        Self {
            prompter: host.clone(),
            notifier: host.clone(),
            navigator: host.clone(),
            scheduler: host,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted host for engine tests

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Everything a run asked the host to do
    #[derive(Debug, Clone, PartialEq)]
    pub enum HostEvent {
        Prompt(String),
        Notify(String),
        Error(String),
        OpenBlock(String),
        OpenPage(String),
        Cursor(String, usize),
        Blur,
        Recurring(String),
    }

    #[derive(Default)]
    pub struct RecordingHost {
        answers: Mutex<VecDeque<Option<String>>>,
        events: Mutex<Vec<HostEvent>>,
    }

    impl RecordingHost {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Queue answers for upcoming prompts; `None` cancels
        pub fn with_answers(answers: Vec<Option<&str>>) -> Arc<Self> {
            let host = Self::default();
            *host.answers.lock().unwrap() = answers
                .into_iter()
                .map(|a| a.map(String::from))
                .collect();
            Arc::new(host)
        }

        pub fn events(&self) -> Vec<HostEvent> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: HostEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    #[async_trait]
    impl Prompter for RecordingHost {
        async fn prompt(&self, request: PromptRequest) -> Option<String> {
            self.push(HostEvent::Prompt(request.label.clone()));
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Some(request.default))
        }
    }

    impl Notifier for RecordingHost {
        fn notify(&self, message: &str, _seconds: u64) {
            self.push(HostEvent::Notify(message.to_string()));
        }

        fn report_error(&self, message: &str, _context: &str) {
            self.push(HostEvent::Error(message.to_string()));
        }
    }

    #[async_trait]
    impl Navigator for RecordingHost {
        async fn open_block(&self, uid: &str) {
            self.push(HostEvent::OpenBlock(uid.to_string()));
        }

        async fn open_page(&self, title: &str) {
            self.push(HostEvent::OpenPage(title.to_string()));
        }

        async fn set_cursor(&self, uid: &str, offset: usize) {
            self.push(HostEvent::Cursor(uid.to_string(), offset));
        }

        async fn blur(&self) {
            self.push(HostEvent::Blur);
        }
    }

    impl Scheduler for RecordingHost {
        fn recurring_ran(&self, workflow: &str) {
            self.push(HostEvent::Recurring(workflow.to_string()));
        }
    }
}
