//! Configuration loading with multi-layer merge

use super::WorkflowConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project-local configuration directory
pub const PROJECT_DIR: &str = ".smartblocks";

/// Top-level smartblocks configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SmartblocksConfig {
    /// Global defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Document store location
    #[serde(default)]
    pub store: StoreSettings,

    /// Recurring daily workflow
    #[serde(default)]
    pub daily: DailySettings,

    /// Extra workflow locations
    #[serde(default)]
    pub workflows: WorkflowSettings,
}

/// Global default settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Defaults {
    /// Characters of block text shown in an error node
    #[serde(default = "default_error_preview_len")]
    pub error_preview_len: usize,

    /// strftime format for page titles made by date commands.
    /// `{ordinal}` renders the day's suffix (st, nd, rd, th).
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_error_preview_len() -> usize {
    50
}

fn default_date_format() -> String {
    "%B %-d{ordinal}, %Y".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            error_preview_len: default_error_preview_len(),
            date_format: default_date_format(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    /// SQLite graph path; `~` and `$VARS` are expanded
    pub path: Option<String>,
}

impl StoreSettings {
    /// Expanded store path, if one is configured
    pub fn resolved_path(&self) -> Result<Option<PathBuf>> {
        self.path
            .as_deref()
            .map(|raw| {
                shellexpand::full(raw)
                    .map(|expanded| PathBuf::from(expanded.as_ref()))
                    .with_context(|| format!("expanding store path '{}'", raw))
            })
            .transpose()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DailySettings {
    /// Name of the workflow the scheduler runs every day
    pub workflow: Option<String>,

    /// Time of day, `HH:MM`
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkflowSettings {
    /// Additional directory searched for workflow files
    pub dir: Option<String>,
}

impl SmartblocksConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/smartblocks/config.toml
    /// 3. .smartblocks/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(user_config_path) = Self::user_config_path() {
            if user_config_path.exists() {
                let user_config = Self::load_file(&user_config_path)
                    .with_context(|| format!("loading {}", user_config_path.display()))?;
                config.merge(user_config);
            }
        }

        let project_config_path = project_root(project_dir).join("config.toml");
        if project_config_path.exists() {
            let project_config = Self::load_file(&project_config_path)
                .with_context(|| format!("loading {}", project_config_path.display()))?;
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Get the user config path (~/.config/smartblocks/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        user_dir().map(|p| p.join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Self) {
        if other.defaults.error_preview_len != default_error_preview_len() {
            self.defaults.error_preview_len = other.defaults.error_preview_len;
        }
        if other.defaults.date_format != default_date_format() {
            self.defaults.date_format = other.defaults.date_format;
        }

        if other.store.path.is_some() {
            self.store.path = other.store.path;
        }

        if other.daily.workflow.is_some() {
            self.daily.workflow = other.daily.workflow;
        }
        if other.daily.time.is_some() {
            self.daily.time = other.daily.time;
        }

        if other.workflows.dir.is_some() {
            self.workflows.dir = other.workflows.dir;
        }
    }

    /// True when `workflow` is the configured recurring workflow
    pub fn is_daily_workflow(&self, workflow: &str) -> bool {
        self.daily
            .workflow
            .as_deref()
            .is_some_and(|daily| daily.eq_ignore_ascii_case(workflow))
    }

    /// Workflow directories in search order (first match wins):
    /// 1. .smartblocks/workflows (project)
    /// 2. `[workflows] dir`
    /// 3. ~/.config/smartblocks/workflows (user)
    pub fn workflow_dirs(&self, project_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut dirs = vec![project_root(project_dir).join("workflows")];

        if let Some(raw) = &self.workflows.dir {
            match shellexpand::full(raw) {
                Ok(expanded) => dirs.push(PathBuf::from(expanded.as_ref())),
                Err(e) => tracing::warn!(dir = %raw, error = %e, "Ignoring workflow dir"),
            }
        }

        if let Some(user) = user_dir() {
            dirs.push(user.join("workflows"));
        }

        dirs
    }
}

fn project_root(project_dir: Option<&Path>) -> PathBuf {
    project_dir
        .map(|p| p.join(PROJECT_DIR))
        .unwrap_or_else(|| PathBuf::from(PROJECT_DIR))
}

fn user_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("smartblocks"))
}

/// Load a workflow file by name from the configured directories
///
/// Returns `None` when no `<name>.toml` exists; predefined workflows are
/// handled by the workflow library.
pub fn load_workflow(
    name: &str,
    config: &SmartblocksConfig,
    project_dir: Option<&Path>,
) -> Result<Option<WorkflowConfig>> {
    find_workflow_file(name, config, project_dir)
        .map(|path| load_workflow_file(&path))
        .transpose()
}

/// First `<name>.toml` in the configured directories
pub fn find_workflow_file(
    name: &str,
    config: &SmartblocksConfig,
    project_dir: Option<&Path>,
) -> Option<PathBuf> {
    let filename = format!("{}.toml", name);
    config
        .workflow_dirs(project_dir)
        .into_iter()
        .map(|dir| dir.join(&filename))
        .find(|path| path.exists())
}

/// Parse a workflow file without validating it
pub fn parse_workflow_file(path: &Path) -> Result<WorkflowConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

/// Load and validate one workflow file
pub fn load_workflow_file(path: &Path) -> Result<WorkflowConfig> {
    let workflow = parse_workflow_file(path)?;

    workflow.validate().map_err(|errors| {
        anyhow::anyhow!("workflow validation failed:\n  {}", errors.join("\n  "))
    })?;

    Ok(workflow)
}

/// Load every `*.toml` workflow in a directory, sorted by file name.
/// A missing directory yields nothing.
pub fn load_workflow_dir(dir: &Path) -> Result<Vec<WorkflowConfig>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    paths.sort();

    paths.iter().map(|p| load_workflow_file(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(path: &Path, contents: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut file = std::fs::File::create(path).unwrap();
        writeln!(file, "{}", contents).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = SmartblocksConfig::default();
        assert_eq!(config.defaults.error_preview_len, 50);
        assert_eq!(config.defaults.date_format, "%B %-d{ordinal}, %Y");
        assert!(config.daily.workflow.is_none());
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        write_file(
            &config_path,
            r#"
            [defaults]
            error_preview_len = 20

            [store]
            path = "~/graph.db"

            [daily]
            workflow = "Morning"
            time = "07:30"
        "#,
        );

        let config = SmartblocksConfig::load_file(&config_path).unwrap();
        assert_eq!(config.defaults.error_preview_len, 20);
        assert_eq!(config.daily.workflow.as_deref(), Some("Morning"));
        assert!(config.is_daily_workflow("morning"));
        assert!(!config.is_daily_workflow("Evening"));

        let path = config.store.resolved_path().unwrap().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.toml");
        write_file(&config_path, "[backends.claude]\ncommand = \"claude\"");
        assert!(SmartblocksConfig::load_file(&config_path).is_err());
    }

    #[test]
    fn test_config_merge() {
        let mut base = SmartblocksConfig::default();
        base.daily.workflow = Some("Morning".into());
        base.store.path = Some("/a.db".into());

        let mut override_config = SmartblocksConfig::default();
        override_config.store.path = Some("/b.db".into());
        override_config.defaults.date_format = "%Y-%m-%d".into();

        base.merge(override_config);

        assert_eq!(base.store.path.as_deref(), Some("/b.db"));
        assert_eq!(base.daily.workflow.as_deref(), Some("Morning"));
        assert_eq!(base.defaults.date_format, "%Y-%m-%d");
        assert_eq!(base.defaults.error_preview_len, 50);
    }

    #[test]
    fn test_load_project_layer() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join(".smartblocks/config.toml"),
            "[daily]\nworkflow = \"Standup\"",
        );

        let config = SmartblocksConfig::load(Some(dir.path())).unwrap();
        assert_eq!(config.daily.workflow.as_deref(), Some("Standup"));
    }

    #[test]
    fn test_load_workflow_from_project() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir.path().join(".smartblocks/workflows/morning.toml"),
            r#"
            name = "Morning"
            [[blocks]]
            text = "<%DATE%>"
        "#,
        );

        let config = SmartblocksConfig::default();
        let workflow = load_workflow("morning", &config, Some(dir.path()))
            .unwrap()
            .unwrap();
        assert_eq!(workflow.name, "Morning");

        assert!(
            load_workflow("missing", &config, Some(dir.path()))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_load_workflow_file_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.toml");
        write_file(&path, "name = \"Empty\"");

        let err = load_workflow_file(&path).unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[test]
    fn test_load_workflow_dir() {
        let dir = TempDir::new().unwrap();
        write_file(&dir.path().join("b.toml"), "name = \"B\"\n[[blocks]]\ntext = \"b\"");
        write_file(&dir.path().join("a.toml"), "name = \"A\"\n[[blocks]]\ntext = \"a\"");
        write_file(&dir.path().join("notes.txt"), "ignored");

        let workflows = load_workflow_dir(dir.path()).unwrap();
        let names: Vec<_> = workflows.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        assert!(load_workflow_dir(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_workflow_dirs_order() {
        let mut config = SmartblocksConfig::default();
        config.workflows.dir = Some("/opt/workflows".into());

        let dirs = config.workflow_dirs(Some(Path::new("/project")));
        assert_eq!(dirs[0], PathBuf::from("/project/.smartblocks/workflows"));
        assert_eq!(dirs[1], PathBuf::from("/opt/workflows"));
    }
}
