mod cli;
mod commands;
mod config;
mod host;
mod logging;
mod node;
mod store;
mod template;
mod workflow;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cli::{OutputMode, create_handler};
use commands::CommandRegistry;
use config::SmartblocksConfig;
use host::{ConsoleHost, Host};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::SqliteStore;
use workflow::{CursorMode, RunRequest, Services, WorkflowLibrary, WorkflowRef, WorkflowRunner};

#[derive(Parser)]
#[command(name = "smartblocks")]
#[command(about = "Run SmartBlocks template workflows against an outliner graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding .smartblocks/ (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Graph database (overrides [store] path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Also write JSON logs to a file; without a value a path under the config dir is used
    #[arg(long, global = true, num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow
    Run {
        /// Workflow name, or ((uid)) of a tagged block
        workflow: String,

        /// Page to append to (defaults to today's daily note)
        #[arg(long, conflicts_with = "block")]
        page: Option<String>,

        /// Block to splice into
        #[arg(long)]
        block: Option<String>,

        /// Start of the replaced range, in characters
        #[arg(long, requires = "block")]
        start: Option<usize>,

        /// End of the replaced range, in characters
        #[arg(long, requires = "block")]
        end: Option<usize>,

        /// Workflow variables
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,

        /// Mark the run as started by a scheduler
        #[arg(long)]
        scheduled: bool,

        /// Answer every prompt with its default
        #[arg(long)]
        yes: bool,
    },

    /// List available workflows
    Workflows,

    /// Validate a workflow file without running it
    Validate {
        /// Workflow name or path to a .toml file
        workflow: String,
    },

    /// List registered commands
    Commands,

    /// Print a page tree
    Show {
        /// Page title
        page: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show recent runs
    History {
        /// Number of runs to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

impl Commands {
    /// Name used for the default log file
    fn log_name(&self) -> &str {
        match self {
            Self::Run { workflow, .. } => workflow,
            _ => "smartblocks",
        }
    }
}

/// Graph location: flag, then config, then the platform data dir
fn store_path(flag: Option<&Path>, config: &SmartblocksConfig) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path.to_path_buf());
    }
    match config.store.resolved_path()? {
        Some(path) => Ok(path),
        None => SqliteStore::default_path(),
    }
}

fn open_store(flag: Option<&Path>, config: &SmartblocksConfig) -> Result<Arc<SqliteStore>> {
    let path = store_path(flag, config)?;
    tracing::debug!(path = %path.display(), "Opening graph");
    Ok(Arc::new(SqliteStore::open(&path)?))
}

fn build_services(
    store: Arc<SqliteStore>,
    config: SmartblocksConfig,
    project_dir: Option<&Path>,
    non_interactive: bool,
) -> Result<Services> {
    let library = WorkflowLibrary::load(&config, project_dir).context("loading workflow files")?;
    Ok(Services {
        store,
        host: Host::from_shared(Arc::new(ConsoleHost::new(non_interactive))),
        registry: Arc::new(CommandRegistry::with_builtins()),
        library: Arc::new(library),
        config: Arc::new(config),
    })
}

fn workflow_ref(value: &str) -> WorkflowRef {
    match value
        .trim()
        .strip_prefix("((")
        .and_then(|v| v.strip_suffix("))"))
    {
        Some(uid) => WorkflowRef::Block(uid.to_string()),
        None => WorkflowRef::Name(value.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match &cli.log_file {
        Some(Some(path)) => Some(path.clone()),
        Some(None) => Some(logging::default_log_path(cli.command.log_name())?),
        None => None,
    };
    let log_guard = logging::init_logging(cli.debug, cli.quiet, log_file)?;

    let project_dir = cli.dir.as_deref();
    let config = SmartblocksConfig::load(project_dir)?;

    let code = match cli.command {
        Commands::Run {
            workflow,
            page,
            block,
            start,
            end,
            vars,
            json,
            scheduled,
            yes,
        } => {
            let store = open_store(cli.store.as_deref(), &config)?;
            let services = build_services(store, config, project_dir, yes)?;
            let target = cli::resolve_target(
                services.store.as_ref(),
                page.as_deref(),
                block.as_deref(),
                start,
                end,
            )
            .await?;

            let mut request = RunRequest::new(workflow_ref(&workflow), target);
            request.variables = cli::parse_variables(&vars)?;
            request.cursor = CursorMode::Mutable;
            request.scheduled = scheduled;

            let handler = create_handler(OutputMode::from_flags(json, cli.quiet));
            let runner = WorkflowRunner::new(services);
            cli::run_workflow(&runner, request, &*handler).await
        }

        Commands::Workflows => {
            let store = open_store(cli.store.as_deref(), &config)?;
            let services = build_services(store, config, project_dir, true)?;
            let handler = create_handler(OutputMode::from_flags(false, cli.quiet));
            cli::list_workflows(&services, &*handler).await?;
            0
        }

        Commands::Validate { workflow } => {
            let handler = create_handler(OutputMode::from_flags(false, cli.quiet));
            let registry = CommandRegistry::with_builtins();
            cli::validate_workflow(&workflow, &config, project_dir, &registry, &*handler)
        }

        Commands::Commands => {
            let handler = create_handler(OutputMode::Console);
            cli::list_commands(&CommandRegistry::with_builtins(), &*handler);
            0
        }

        Commands::Show { page, json } => {
            let store = open_store(cli.store.as_deref(), &config)?;
            let handler = create_handler(OutputMode::from_flags(json, cli.quiet));
            cli::show_page(&*store, &page, &*handler).await?
        }

        Commands::History { limit } => {
            let store = open_store(cli.store.as_deref(), &config)?;
            let handler = create_handler(OutputMode::from_flags(false, cli.quiet));
            cli::show_history(&store, limit, &*handler)?;
            0
        }
    };

    if code != 0 {
        // Flush buffered log lines before exiting
        drop(log_guard);
        std::process::exit(code);
    }

    Ok(())
}
