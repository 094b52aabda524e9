/// Pipeline configuration, optionally loaded from jvmscope.json
use crate::config::presets::Toolchain;
use crate::config::types::{Result, ScopeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File looked up in the current directory by `load_default`
pub const DEFAULT_CONFIG_FILE: &str = "jvmscope.json";

/// Upper bound on what one stage adds past its timeout: term grace, reap and
/// output drain
const STAGE_OVERRUN: Duration = Duration::from_secs(3);

/// Configuration handed to the pipeline at construction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory under which per-request workspaces are created
    pub temp_root: PathBuf,
    /// Name prefix identifying workspaces owned by this component
    pub workspace_prefix: String,
    /// Bound for compile, bytecode and JIT stages
    pub stage_timeout_ms: u64,
    /// Bound for native-image
    pub native_build_timeout_ms: u64,
    /// Bound for each disassembler candidate; the stage timeout when unset
    pub disassembler_timeout_ms: Option<u64>,
    /// Cap on captured output per stage
    pub max_output_bytes: usize,
    /// Append compiler diagnostics to "Compilation failed"
    pub surface_compiler_diagnostics: bool,
    /// Workspaces older than this are swept by the reaper
    pub orphan_max_age_secs: u64,
    pub toolchain: Toolchain,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            temp_root: std::env::temp_dir(),
            workspace_prefix: "jvmscope-".to_string(),
            stage_timeout_ms: 10_000,
            native_build_timeout_ms: 60_000,
            disassembler_timeout_ms: None,
            max_output_bytes: 256 * 1024 * 1024,
            surface_compiler_diagnostics: false,
            orphan_max_age_secs: 3600,
            toolchain: Toolchain::default(),
        }
    }
}

impl PipelineConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_millis(self.stage_timeout_ms)
    }

    pub fn native_build_timeout(&self) -> Duration {
        Duration::from_millis(self.native_build_timeout_ms)
    }

    pub fn disassembler_timeout(&self) -> Duration {
        self.disassembler_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.stage_timeout())
    }

    pub fn orphan_max_age(&self) -> Duration {
        Duration::from_secs(self.orphan_max_age_secs)
    }

    /// Worst-case wall time of one run.
    ///
    /// Compile, then the slowest view: a single stage for bytecode and JIT,
    /// native-image plus every disassembler candidate for AOT.
    pub fn longest_run(&self) -> Duration {
        let candidates = self.toolchain.disassembler_candidates.len() as u32;
        let aot = self.native_build_timeout() + self.disassembler_timeout() * candidates;
        let view = aot.max(self.stage_timeout());
        self.stage_timeout() + view + STAGE_OVERRUN * (2 + candidates)
    }

    /// Smallest reaper age that cannot catch a workspace still in use
    pub fn min_orphan_age(&self) -> Duration {
        let longest = self.longest_run();
        let secs = longest.as_secs() + u64::from(longest.subsec_nanos() > 0);
        Duration::from_secs(secs)
    }

    /// Reject a reaper age that would sweep workspaces of in-flight runs
    pub fn check_orphan_age(&self, max_age: Duration) -> Result<()> {
        let min = self.min_orphan_age();
        if max_age < min {
            return Err(ScopeError::Config(format!(
                "orphan max age {}s is shorter than the longest run ({}s)",
                max_age.as_secs(),
                min.as_secs()
            )));
        }
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ScopeError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: PipelineConfig = serde_json::from_str(&content)
            .map_err(|e| ScopeError::Config(format!("Failed to parse config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load ./jvmscope.json when present, defaults otherwise
    pub fn load_default() -> Result<Self> {
        let config_path = std::env::current_dir()
            .map_err(|e| ScopeError::Config(format!("Failed to get current directory: {}", e)))?
            .join(DEFAULT_CONFIG_FILE);

        if !config_path.exists() {
            log::debug!("{} not found, using built-in defaults", DEFAULT_CONFIG_FILE);
            return Ok(Self::default());
        }

        log::info!("Loading configuration from {}", config_path.display());
        Self::load_from_file(config_path)
    }

    /// Reject values that would make every run fail or collide
    pub fn validate(&self) -> Result<()> {
        if self.stage_timeout_ms == 0
            || self.native_build_timeout_ms == 0
            || self.disassembler_timeout_ms == Some(0)
        {
            return Err(ScopeError::Config("timeouts must be non-zero".to_string()));
        }
        if self.max_output_bytes == 0 {
            return Err(ScopeError::Config(
                "max_output_bytes must be non-zero".to_string(),
            ));
        }
        if self.workspace_prefix.is_empty()
            || self.workspace_prefix.contains(std::path::MAIN_SEPARATOR)
        {
            return Err(ScopeError::Config(format!(
                "invalid workspace prefix: {:?}",
                self.workspace_prefix
            )));
        }
        if self.toolchain.disassembler_candidates.is_empty() {
            return Err(ScopeError::Config(
                "at least one disassembler candidate is required".to_string(),
            ));
        }
        self.check_orphan_age(self.orphan_max_age())
    }
}
