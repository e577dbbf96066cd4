mod load;
mod types;

pub use load::{apply_env_overrides, get_testgen_data_dir, load_default, load_from_path};
pub use types::{
    AgentConfig, AppConfig, LoggingConfig, PerspectiveConfig, ReportsConfig, TestExecutionConfig,
    TestRunnerKind,
};
