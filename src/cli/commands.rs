//! CLI command implementations

use super::output::{OutputEvent, OutputHandler};
use crate::commands::{CommandRegistry, roam_title};
use crate::config::{SmartblocksConfig, find_workflow_file, parse_workflow_file};
use crate::node::Node;
use crate::store::{DocumentStore, SqliteStore};
use crate::template::{Token, split_args, suggest_correction, tokenize};
use crate::workflow::{RunRequest, Services, Target, WorkflowLibrary, WorkflowOrigin, WorkflowRunner};
use anyhow::{Context, bail};
use std::collections::HashMap;
use std::path::Path;

/// Parse `--var key=value` pairs
pub fn parse_variables(vars: &[String]) -> anyhow::Result<HashMap<String, String>> {
    let mut parsed = HashMap::new();

    for var in vars {
        let Some((key, value)) = var.split_once('=') else {
            bail!("variable '{}' is not in key=value form", var);
        };
        let key = key.trim();
        if key.is_empty() {
            bail!("variable '{}' has an empty name", var);
        }
        parsed.insert(key.to_string(), value.to_string());
    }

    Ok(parsed)
}

/// Work out where a run writes.
///
/// A block target splices at `start..end` (both default to the end of the
/// block's text). A page target is created when missing; with neither, the
/// run appends to today's daily note.
pub async fn resolve_target(
    store: &dyn DocumentStore,
    page: Option<&str>,
    block: Option<&str>,
    start: Option<usize>,
    end: Option<usize>,
) -> anyhow::Result<Target> {
    if let Some(uid) = block {
        let text = store
            .text(uid)
            .await?
            .with_context(|| format!("block '{}' not found", uid))?;
        let len = text.chars().count();
        let start = start.unwrap_or(len);
        let end = end.unwrap_or(start);
        if start > end || end > len {
            bail!(
                "range {}..{} does not fit block '{}' ({} characters)",
                start,
                end,
                uid,
                len
            );
        }
        return Ok(Target::Block {
            uid: uid.to_string(),
            start,
            end,
        });
    }

    let title = match page {
        Some(title) => title.to_string(),
        None => roam_title(chrono::Local::now().date_naive()),
    };
    let uid = store.create_page(&title).await?;
    Ok(Target::Page(uid))
}

/// Run a workflow
pub async fn run_workflow(
    runner: &WorkflowRunner,
    request: RunRequest,
    handler: &dyn OutputHandler,
) -> i32 {
    handler.emit(OutputEvent::RunStart {
        workflow: request.workflow.to_string(),
        target: request.target.uid().to_string(),
    });

    match runner.run(request).await {
        Ok(outcome) => {
            handler.emit(OutputEvent::RunComplete {
                workflow: outcome.workflow.clone(),
                blocks: outcome.nodes.iter().map(Node::count).sum(),
                root_uid: outcome.root_uid.clone(),
            });
            handler.outcome(&outcome);
            0
        }
        Err(e) => {
            handler.emit(OutputEvent::Error {
                error: e.to_string(),
            });
            1
        }
    }
}

/// List every workflow the engine can find
pub async fn list_workflows(services: &Services, handler: &dyn OutputHandler) -> anyhow::Result<()> {
    let workflows = services.library.list(services.store.as_ref()).await?;

    for workflow in workflows {
        let origin = match &workflow.origin {
            WorkflowOrigin::Predefined => "built-in".to_string(),
            WorkflowOrigin::File => "file".to_string(),
            WorkflowOrigin::Block(uid) => format!("block (({}))", uid),
        };
        let daily = if services.config.is_daily_workflow(&workflow.name) {
            " [daily]"
        } else {
            ""
        };
        handler.emit(OutputEvent::Info {
            message: format!("{} ({}){}", workflow.name, origin, daily),
        });
        if let Some(description) = workflow.description.filter(|d| !d.is_empty()) {
            handler.emit(OutputEvent::Info {
                message: format!("  {}", description),
            });
        }
    }

    Ok(())
}

/// Unknown and deprecated commands anywhere in a block tree
fn lint_blocks(blocks: &[Node], registry: &CommandRegistry, warnings: &mut Vec<String>) {
    for block in blocks {
        lint_text(&block.text, registry, warnings);
        lint_blocks(&block.children, registry, warnings);
    }
}

fn lint_text(text: &str, registry: &CommandRegistry, warnings: &mut Vec<String>) {
    for token in tokenize(text) {
        let Token::Command(payload) = token else {
            continue;
        };
        let (name, rest) = match payload.split_once(':') {
            Some((name, rest)) => (name, Some(rest)),
            None => (payload.as_str(), None),
        };

        match registry.get(name) {
            None => {
                let names = registry.names();
                let warning = match suggest_correction(name.trim(), &names) {
                    Some(s) => format!("unknown command {} (did you mean {}?)", name.trim(), s),
                    None => format!("unknown command {}", name.trim()),
                };
                warnings.push(warning);
            }
            Some(command) if command.illegal => {
                warnings.push(format!("{} is deprecated", command.name));
            }
            Some(_) => {}
        }

        for arg in rest.map(split_args).unwrap_or_default() {
            lint_text(&arg, registry, warnings);
        }
    }
}

/// Validate a workflow file, given by path or by name
pub fn validate_workflow(
    workflow: &str,
    config: &SmartblocksConfig,
    project_dir: Option<&Path>,
    registry: &CommandRegistry,
    handler: &dyn OutputHandler,
) -> i32 {
    let direct = Path::new(workflow);
    let path = if direct.extension().is_some_and(|ext| ext == "toml") && direct.exists() {
        Some(direct.to_path_buf())
    } else {
        find_workflow_file(workflow, config, project_dir)
    };

    let Some(path) = path else {
        if WorkflowLibrary::predefined()
            .iter()
            .any(|w| w.name.eq_ignore_ascii_case(workflow))
        {
            handler.emit(OutputEvent::Info {
                message: format!("✓ Workflow '{}' is built in", workflow),
            });
            return 0;
        }
        handler.emit(OutputEvent::Error {
            error: format!("No workflow file found for '{}'", workflow),
        });
        return 1;
    };

    let wf = match parse_workflow_file(&path) {
        Ok(wf) => wf,
        Err(e) => {
            handler.emit(OutputEvent::Error {
                error: format!("Failed to load workflow: {:#}", e),
            });
            return 1;
        }
    };

    if let Err(errors) = wf.validate() {
        handler.emit(OutputEvent::Info {
            message: format!("✗ Workflow '{}' has {} error(s):", wf.name, errors.len()),
        });
        for err in &errors {
            handler.emit(OutputEvent::Info {
                message: format!("  - {}", err),
            });
        }
        return 1;
    }

    handler.emit(OutputEvent::Info {
        message: format!(
            "✓ Workflow '{}' is valid ({} blocks)",
            wf.name,
            wf.block_count()
        ),
    });

    let mut warnings = Vec::new();
    lint_blocks(&wf.blocks, registry, &mut warnings);
    for warning in warnings {
        handler.emit(OutputEvent::Info {
            message: format!("  ! {}", warning),
        });
    }

    0
}

/// List registered commands
pub fn list_commands(registry: &CommandRegistry, handler: &dyn OutputHandler) {
    for command in registry.commands() {
        let mut line = command.name.clone();
        if !command.description.is_empty() {
            line.push_str(" - ");
            line.push_str(&command.description);
        }
        if command.illegal {
            line.push_str(" (deprecated)");
        }
        handler.emit(OutputEvent::Info { message: line });
    }
}

/// Print a page and everything under it
pub async fn show_page(
    store: &dyn DocumentStore,
    title: &str,
    handler: &dyn OutputHandler,
) -> anyhow::Result<i32> {
    let Some(uid) = store.find_page(title).await? else {
        handler.emit(OutputEvent::Error {
            error: format!("Page '{}' not found", title),
        });
        return Ok(1);
    };

    let page = store
        .full_tree(&uid)
        .await?
        .with_context(|| format!("page '{}' vanished while reading", title))?;
    handler.tree(title, &page);
    Ok(0)
}

/// Recent runs from the store's log
pub fn show_history(store: &SqliteStore, limit: usize, handler: &dyn OutputHandler) -> anyhow::Result<()> {
    let runs = store.recent_runs(limit)?;
    if runs.is_empty() {
        handler.emit(OutputEvent::Info {
            message: "(no runs recorded)".into(),
        });
        return Ok(());
    }

    for run in runs {
        let mut line = format!("{} -> {}", run.workflow_name, run.target_uid);
        match &run.root_uid {
            Some(root) => line.push_str(&format!(" (({})), {} block(s)", root, run.block_count)),
            None => line.push_str(", no output"),
        }
        if run.scheduled {
            line.push_str(" [scheduled]");
        }
        if !run.illegal_commands.is_empty() {
            line.push_str(&format!(" deprecated: {}", run.illegal_commands.join(", ")));
        }
        handler.emit(OutputEvent::Info { message: line });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::testing::MockHandler;
    use crate::store::RunRecord;
    use crate::workflow::WorkflowRef;
    use crate::workflow::testing::services;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{}", contents).unwrap();
    }

    #[test]
    fn test_parse_variables() {
        let vars = vec!["name=Ada".to_string(), "expr=a=b".to_string()];
        let parsed = parse_variables(&vars).unwrap();
        assert_eq!(parsed.get("name").map(String::as_str), Some("Ada"));
        assert_eq!(parsed.get("expr").map(String::as_str), Some("a=b"));

        assert!(parse_variables(&["loose".to_string()]).is_err());
        assert!(parse_variables(&["=x".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_resolve_block_target() {
        let store = SqliteStore::open_in_memory().unwrap();
        let page = store.create_page("Inbox").await.unwrap();
        let block = store.create_block(&page, 0, &Node::text("héllo")).await.unwrap();

        let target = resolve_target(&store, None, Some(&block), None, None).await.unwrap();
        assert_eq!(
            target,
            Target::Block {
                uid: block.clone(),
                start: 5,
                end: 5
            }
        );

        let target = resolve_target(&store, None, Some(&block), Some(1), Some(3)).await.unwrap();
        assert_eq!(target, Target::Block { uid: block.clone(), start: 1, end: 3 });

        assert!(resolve_target(&store, None, Some(&block), Some(2), Some(9)).await.is_err());
        assert!(resolve_target(&store, None, Some("missing"), None, None).await.is_err());
    }

    #[tokio::test]
    async fn test_resolve_page_target_creates_page() {
        let store = SqliteStore::open_in_memory().unwrap();
        let target = resolve_target(&store, Some("Weekly"), None, None, None).await.unwrap();
        let uid = store.find_page("Weekly").await.unwrap().unwrap();
        assert_eq!(target, Target::Page(uid));
    }

    #[tokio::test]
    async fn test_run_workflow_reports() {
        let services = services();
        let page = services.store.create_page("Inbox").await.unwrap();
        let runner = WorkflowRunner::new(services);
        let handler = MockHandler::default();

        let request = RunRequest::new(WorkflowRef::Name("Horizontal Line".into()), Target::Page(page));
        assert_eq!(run_workflow(&runner, request.clone(), &handler).await, 0);
        let outcomes = handler.outcomes.lock().unwrap().clone();
        assert_eq!(outcomes[0].nodes[0].text, "---");

        let mut missing = request;
        missing.workflow = WorkflowRef::Name("Horizontal Lien".into());
        assert_eq!(run_workflow(&runner, missing, &handler).await, 1);
        assert!(matches!(
            handler.events().last(),
            Some(OutputEvent::Error { error }) if error.contains("Horizontal Line")
        ));
    }

    #[tokio::test]
    async fn test_list_workflows_includes_predefined() {
        let services = services();
        let handler = MockHandler::default();
        list_workflows(&services, &handler).await.unwrap();
        assert!(handler.messages().contains(&"Today (built-in)".to_string()));
    }

    #[test]
    fn test_validate_reports_errors_and_lint() {
        let dir = TempDir::new().unwrap();
        let registry = CommandRegistry::with_builtins();
        let config = SmartblocksConfig::default();

        write_file(
            &dir.path().join(".smartblocks/workflows/good.toml"),
            r#"
            name = "Good"
            [[blocks]]
            text = "<%CURRENTTIME%> <%SET:x,<%DAET%>%>"
        "#,
        );
        let handler = MockHandler::default();
        let code = validate_workflow("good", &config, Some(dir.path()), &registry, &handler);
        assert_eq!(code, 0);
        let messages = handler.messages();
        assert!(messages[0].contains("is valid (1 blocks)"));
        assert!(messages.iter().any(|m| m.contains("CURRENTTIME is deprecated")));
        assert!(messages.iter().any(|m| m.contains("unknown command DAET (did you mean DATE?)")));

        let bad = dir.path().join("bad.toml");
        write_file(&bad, "name = \"\"");
        let handler = MockHandler::default();
        let code = validate_workflow(bad.to_str().unwrap(), &config, None, &registry, &handler);
        assert_eq!(code, 1);
        assert!(handler.messages()[0].contains("2 error(s)"));
    }

    #[test]
    fn test_validate_builtin_and_missing() {
        let registry = CommandRegistry::with_builtins();
        let config = SmartblocksConfig::default();
        let dir = TempDir::new().unwrap();

        let handler = MockHandler::default();
        assert_eq!(validate_workflow("today", &config, Some(dir.path()), &registry, &handler), 0);
        assert_eq!(validate_workflow("nothing-here", &config, Some(dir.path()), &registry, &handler), 1);
    }

    #[test]
    fn test_list_commands_marks_deprecated() {
        let handler = MockHandler::default();
        list_commands(&CommandRegistry::with_builtins(), &handler);
        let messages = handler.messages();
        assert_eq!(messages.len(), 41);
        let current = messages.iter().find(|m| m.starts_with("CURRENTTIME")).unwrap();
        assert!(current.ends_with("(deprecated)"));
        assert!(!messages.iter().any(|m| m.starts_with("TIME ") && m.contains("deprecated")));
    }

    #[tokio::test]
    async fn test_show_page() {
        let store = SqliteStore::open_in_memory().unwrap();
        let page = store.create_page("Inbox").await.unwrap();
        store
            .create_block(&page, 0, &Node::text("a").with_children(vec![Node::text("b")]))
            .await
            .unwrap();

        let handler = MockHandler::default();
        assert_eq!(show_page(&store, "Inbox", &handler).await.unwrap(), 0);
        assert_eq!(handler.trees.lock().unwrap()[0], "- a\n  - b\n");

        assert_eq!(show_page(&store, "Nope", &handler).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_show_history() {
        let store = SqliteStore::open_in_memory().unwrap();
        let handler = MockHandler::default();
        show_history(&store, 5, &handler).unwrap();
        assert_eq!(handler.messages(), vec!["(no runs recorded)"]);

        store
            .record_run(&RunRecord {
                workflow_name: "Daily".into(),
                target_uid: "page1".into(),
                root_uid: Some("abc".into()),
                block_count: 2,
                illegal_commands: vec!["CURRENTTIME".into()],
                scheduled: true,
            })
            .await
            .unwrap();
        let handler = MockHandler::default();
        show_history(&store, 5, &handler).unwrap();
        assert_eq!(
            handler.messages(),
            vec!["Daily -> page1 ((abc)), 2 block(s) [scheduled] deprecated: CURRENTTIME"]
        );
    }
}
