//! Tree builder: evaluates template blocks into generated blocks
//!
//! Each template block gets a fresh uid (or the intro uid when splicing into an
//! existing block), its text is expanded, and its children are built
//! recursively. Exit policies can drop a block; indent and unindent
//! directives move it one level down or up.

use super::context::{ExitBlock, IndentDirective};
use super::executor::{BoxFuture, Interpreter};
use crate::node::Node;
use crate::store::generate_uid;

/// Splice point for the first generated block
#[derive(Debug, Clone, PartialEq)]
pub struct Intro {
    /// Uid of the existing block the first node becomes
    pub uid: String,
    /// Text already in that block before the trigger
    pub content: String,
}

/// Output of one sibling list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltLevel {
    pub nodes: Vec<Node>,
    /// Unindented blocks that belong to the enclosing level
    pub escaped: Vec<Node>,
}

impl BuiltLevel {
    /// Flatten for the top level, where there is no outer list
    pub fn into_nodes(mut self) -> Vec<Node> {
        self.nodes.append(&mut self.escaped);
        self.nodes
    }
}

impl Interpreter {
    /// Build a top-level sibling list of template blocks.
    ///
    /// There is no outer list here, so an unindent keeps the block in place.
    pub fn process_children<'a>(
        &'a mut self,
        sources: &'a [Node],
        intro: Option<Intro>,
    ) -> BoxFuture<'a, BuiltLevel> {
        self.build_level(sources, intro, false)
    }

    fn build_level<'a>(
        &'a mut self,
        sources: &'a [Node],
        intro: Option<Intro>,
        nested: bool,
    ) -> BoxFuture<'a, BuiltLevel> {
        Box::pin(async move {
            let mut level = BuiltLevel::default();

            for (index, source) in sources.iter().enumerate() {
                if self.ctx.exit_workflow {
                    break;
                }

                let intro = intro.as_ref().filter(|_| index == 0);
                let uid = intro.map(|i| i.uid.clone()).unwrap_or_else(generate_uid);
                if let Some(template_uid) = &source.uid {
                    self.ctx
                        .ref_mapping
                        .insert(template_uid.clone(), uid.clone());
                }
                self.ctx.current_uid = uid.clone();
                self.ctx.current_content = intro.map(|i| i.content.clone()).unwrap_or_default();

                let group = self.process_node(source, &uid).await;

                match self.ctx.take_indent(&uid) {
                    IndentDirective::Unindent if nested => level.escaped.extend(group),
                    IndentDirective::Unindent => level.nodes.extend(group),
                    IndentDirective::Indent => match level.nodes.last_mut() {
                        Some(previous) => previous.children.extend(group),
                        // Nothing to nest under
                        None => level.nodes.extend(group),
                    },
                    IndentDirective::None => level.nodes.extend(group),
                }
            }

            level
        })
    }

    /// Evaluate one template block; returns the block followed by any
    /// extra blocks its commands produced and any children that unindented
    async fn process_node(&mut self, source: &Node, uid: &str) -> Vec<Node> {
        let expansion = match self.expand(&source.text, true).await {
            Ok(expansion) => expansion,
            Err(e) if e.is_cancelled() => {
                tracing::info!(workflow = %self.ctx.workflow_name, uid = uid, "Prompt cancelled, stopping run");
                self.ctx.finish_block();
                self.ctx.exit_workflow = true;
                return Vec::new();
            }
            Err(e) => return vec![self.error_node(source, uid, &e.to_string())],
        };

        let (exit, props) = self.ctx.finish_block();
        let discard = match exit {
            ExitBlock::Yes => true,
            ExitBlock::End | ExitBlock::Empty => expansion.text.trim().is_empty(),
            ExitBlock::No | ExitBlock::Childless => false,
        };
        if discard {
            tracing::trace!(uid = uid, exit = ?exit, "Block dropped");
            return Vec::new();
        }

        let mut children = expansion.children;
        let mut escaped = Vec::new();
        if !self.ctx.exit_workflow && !source.children.is_empty() {
            let built = self.build_level(&source.children, None, true).await;
            children.extend(built.nodes);
            escaped = built.escaped;
        }

        if exit == ExitBlock::Childless && children.is_empty() {
            tracing::trace!(uid = uid, "Childless block dropped");
            return escaped;
        }

        let mut node = Node {
            text: expansion.text,
            children,
            uid: Some(uid.to_string()),
            heading: source.heading,
            text_align: source.text_align,
            view_type: source.view_type,
            open: source.open,
            props: source.props.clone(),
        };
        node.apply_props(props);

        let mut group = Vec::with_capacity(1 + expansion.next_blocks.len() + escaped.len());
        group.push(node);
        group.extend(expansion.next_blocks);
        group.extend(escaped);
        group
    }

    /// Stand-in for a block whose evaluation failed
    fn error_node(&mut self, source: &Node, uid: &str, error: &str) -> Node {
        let preview: String = source
            .text
            .chars()
            .take(self.config().defaults.error_preview_len)
            .collect();

        tracing::warn!(
            workflow = %self.ctx.workflow_name,
            uid = uid,
            error = error,
            "Block failed: {}",
            preview
        );
        self.host()
            .notifier
            .report_error(error, &self.ctx.workflow_name);

        // Per-block signals from the failed evaluation must not leak
        self.ctx.finish_block();

        Node::text(format!(
            "Block threw an error while running: {}...",
            preview
        ))
        .with_uid(uid)
    }
}
