//! Configuration types and loading for smartblocks

mod loader;
mod workflow;

#[allow(unused_imports)]
pub use loader::{
    DailySettings, Defaults, SmartblocksConfig, StoreSettings, WorkflowSettings,
    find_workflow_file, load_workflow, load_workflow_dir, load_workflow_file, parse_workflow_file,
};
pub use workflow::WorkflowConfig;
