use std::path::PathBuf;

use sheetflow_core::cache_keys;
use sheetflow_core::env::var_or;
use sheetflow_core::error::CoreError;
use sheetflow_core::upload::DEFAULT_MAX_FILE_BYTES;

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root under which uploaded geometry is stored, per owner and project.
    pub upload_dir: PathBuf,
    /// Per-file size ceiling for uploaded parts.
    pub max_upload_file_bytes: u64,
    /// The cache key evicted whenever a task is created or completed.
    pub task_cache_key: String,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `UPLOAD_DIR`            | `./uploads` |
    /// | `MAX_UPLOAD_FILE_BYTES` | `1048576`   |
    /// | `TASK_CACHE_KEY`        | `tasks`     |
    pub fn from_env() -> Result<Self, CoreError> {
        let defaults = Self::default();
        Ok(Self {
            upload_dir: var_or("UPLOAD_DIR", defaults.upload_dir)?,
            max_upload_file_bytes: var_or("MAX_UPLOAD_FILE_BYTES", defaults.max_upload_file_bytes)?,
            task_cache_key: var_or("TASK_CACHE_KEY", defaults.task_cache_key)?,
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("./uploads"),
            max_upload_file_bytes: DEFAULT_MAX_FILE_BYTES,
            task_cache_key: cache_keys::TASK_LIST.to_string(),
        }
    }
}
