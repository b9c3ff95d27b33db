//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::node::Node;
use crate::workflow::RunOutcome;
use serde::Serialize;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Pick a mode from the global flags; JSON wins over quiet
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Console
        }
    }
}

/// Events emitted while a command runs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutputEvent {
    RunStart {
        workflow: String,
        target: String,
    },
    RunComplete {
        workflow: String,
        blocks: usize,
        root_uid: Option<String>,
    },
    Error {
        error: String,
    },
    Info {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write the blocks a run produced
    fn outcome(&self, outcome: &RunOutcome);

    /// Write a stored page
    fn tree(&self, title: &str, page: &Node);
}

/// Indented outline, two spaces per level
pub fn render_outline(nodes: &[Node]) -> String {
    fn walk(out: &mut String, nodes: &[Node], depth: usize) {
        for node in nodes {
            out.push_str(&"  ".repeat(depth));
            out.push_str("- ");
            if let Some(level) = node.heading.filter(|l| *l > 0) {
                out.push_str(&"#".repeat(level as usize));
                out.push(' ');
            }
            out.push_str(&node.text);
            if node.open == Some(false) && !node.children.is_empty() {
                out.push_str(" [collapsed]");
            }
            out.push('\n');
            walk(out, &node.children, depth + 1);
        }
    }

    let mut out = String::new();
    walk(&mut out, nodes, 0);
    out
}

/// Console output handler
pub struct ConsoleHandler;

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::RunStart { workflow, target } => {
                eprintln!("Running '{}' into {}", workflow, target);
            }
            OutputEvent::RunComplete {
                workflow,
                blocks,
                root_uid,
            } => match root_uid {
                Some(root) => eprintln!("✓ '{}' wrote {} block(s) at (({}))", workflow, blocks, root),
                None => eprintln!("✓ '{}' produced no blocks", workflow),
            },
            OutputEvent::Error { error } => {
                eprintln!("✗ {}", error);
            }
            OutputEvent::Info { message } => {
                println!("{}", message);
            }
        }
    }

    fn outcome(&self, outcome: &RunOutcome) {
        print!("{}", render_outline(&outcome.nodes));
    }

    fn tree(&self, title: &str, page: &Node) {
        println!("{}", title);
        print!("{}", render_outline(&page.children));
    }
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        match json {
            Ok(s) => println!("{}", s),
            Err(e) => tracing::error!(error = %e, "Failed to serialize output"),
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        // Only failures go out as events; stdout carries one document
        if let OutputEvent::Error { .. } = event {
            self.print_json(&event);
        }
    }

    fn outcome(&self, outcome: &RunOutcome) {
        self.print_json(outcome);
    }

    fn tree(&self, _title: &str, page: &Node) {
        self.print_json(page);
    }
}

/// Quiet handler that only prints results
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        if let OutputEvent::Error { error } = event {
            eprintln!("{}", error);
        }
    }

    fn outcome(&self, outcome: &RunOutcome) {
        print!("{}", render_outline(&outcome.nodes));
    }

    fn tree(&self, _title: &str, page: &Node) {
        print!("{}", render_outline(&page.children));
    }
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler),
        OutputMode::Json => Box::new(JsonHandler::new(true)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Handler that records what it was asked to print
    #[derive(Default, Clone)]
    pub struct MockHandler {
        pub events: Arc<Mutex<Vec<OutputEvent>>>,
        pub outcomes: Arc<Mutex<Vec<RunOutcome>>>,
        pub trees: Arc<Mutex<Vec<String>>>,
    }

    impl MockHandler {
        pub fn events(&self) -> Vec<OutputEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn messages(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    OutputEvent::Info { message } => Some(message),
                    _ => None,
                })
                .collect()
        }
    }

    impl OutputHandler for MockHandler {
        fn emit(&self, event: OutputEvent) {
            self.events.lock().unwrap().push(event);
        }

        fn outcome(&self, outcome: &RunOutcome) {
            self.outcomes.lock().unwrap().push(outcome.clone());
        }

        fn tree(&self, _title: &str, page: &Node) {
            self.trees.lock().unwrap().push(render_outline(&page.children));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockHandler;
    use super::*;

    #[test]
    fn test_output_mode_from_flags() {
        assert_eq!(OutputMode::from_flags(true, true), OutputMode::Json);
        assert_eq!(OutputMode::from_flags(false, true), OutputMode::Quiet);
        assert_eq!(OutputMode::from_flags(false, false), OutputMode::Console);
    }

    #[test]
    fn test_render_outline() {
        let mut title = Node::text("Title");
        title.heading = Some(2);
        title.open = Some(false);
        title.children = vec![Node::text("child").with_children(vec![Node::text("grandchild")])];
        let rendered = render_outline(&[title, Node::text("next")]);
        assert_eq!(
            rendered,
            "- ## Title [collapsed]\n  - child\n    - grandchild\n- next\n"
        );
    }

    #[test]
    fn test_mock_handler_captures_events() {
        let handler = MockHandler::default();
        handler.emit(OutputEvent::RunStart {
            workflow: "Daily".into(),
            target: "page".into(),
        });
        handler.emit(OutputEvent::Info {
            message: "hello".into(),
        });
        assert_eq!(handler.events().len(), 2);
        assert_eq!(handler.messages(), vec!["hello"]);
    }

    #[test]
    fn test_event_json_is_tagged() {
        let json = serde_json::to_value(OutputEvent::RunComplete {
            workflow: "Daily".into(),
            blocks: 3,
            root_uid: None,
        })
        .unwrap();
        assert_eq!(json["type"], "RunComplete");
        assert_eq!(json["blocks"], 3);
    }
}
