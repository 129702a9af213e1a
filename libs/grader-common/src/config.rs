// Engine configuration for the grader
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/grader.json";

/// Settings shared by every grading run on this host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Writable directory under which per-run workspaces are created
    #[serde(default = "default_scratch_root")]
    pub scratch_root: PathBuf,

    /// Compiler executable (resolved through PATH when not absolute)
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Runtime executable used to launch the compiled artifact
    #[serde(default = "default_runtime")]
    pub runtime: String,

    #[serde(default = "default_compile_timeout_ms")]
    pub compile_timeout_ms: u64,

    /// Wall-clock budget for each test case
    #[serde(default = "default_test_timeout_ms")]
    pub test_timeout_ms: u64,

    /// Prepend the standard I/O imports to every submission
    #[serde(default = "default_inject_preamble")]
    pub inject_preamble: bool,

    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,

    /// Cap on captured stdout and on captured stderr, per process
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
}

fn default_scratch_root() -> PathBuf {
    std::env::temp_dir().join("grader")
}

fn default_compiler() -> String {
    "javac".to_string()
}

fn default_runtime() -> String {
    "java".to_string()
}

const fn default_compile_timeout_ms() -> u64 {
    10_000
}

const fn default_test_timeout_ms() -> u64 {
    5_000
}

const fn default_inject_preamble() -> bool {
    true
}

const fn default_max_source_bytes() -> usize {
    1024 * 1024
}

const fn default_max_output_bytes() -> usize {
    1024 * 1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scratch_root: default_scratch_root(),
            compiler: default_compiler(),
            runtime: default_runtime(),
            compile_timeout_ms: default_compile_timeout_ms(),
            test_timeout_ms: default_test_timeout_ms(),
            inject_preamble: default_inject_preamble(),
            max_source_bytes: default_max_source_bytes(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Grader config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `config/grader.json` if present, defaults otherwise
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `GRADER_*` environment variables on top of this config
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = lookup("GRADER_SCRATCH_ROOT") {
            self.scratch_root = PathBuf::from(root);
        }
        if let Some(compiler) = lookup("GRADER_COMPILER") {
            self.compiler = compiler;
        }
        if let Some(runtime) = lookup("GRADER_RUNTIME") {
            self.runtime = runtime;
        }
        if let Some(ms) = lookup("GRADER_COMPILE_TIMEOUT_MS") {
            self.compile_timeout_ms = ms
                .parse()
                .with_context(|| format!("Invalid GRADER_COMPILE_TIMEOUT_MS: {}", ms))?;
        }
        if let Some(ms) = lookup("GRADER_TEST_TIMEOUT_MS") {
            self.test_timeout_ms = ms
                .parse()
                .with_context(|| format!("Invalid GRADER_TEST_TIMEOUT_MS: {}", ms))?;
        }
        if let Some(bytes) = lookup("GRADER_MAX_OUTPUT_BYTES") {
            self.max_output_bytes = bytes
                .parse()
                .with_context(|| format!("Invalid GRADER_MAX_OUTPUT_BYTES: {}", bytes))?;
        }
        if let Some(flag) = lookup("GRADER_INJECT_PREAMBLE") {
            self.inject_preamble = match flag.to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => bail!("Invalid GRADER_INJECT_PREAMBLE: {}", other),
            };
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compile_timeout_ms == 0 {
            bail!("compile_timeout_ms must be greater than zero");
        }
        if self.test_timeout_ms == 0 {
            bail!("test_timeout_ms must be greater than zero");
        }
        if self.max_output_bytes == 0 {
            bail!("max_output_bytes must be greater than zero");
        }
        if self.compiler.trim().is_empty() || self.runtime.trim().is_empty() {
            bail!("compiler and runtime must be set");
        }
        Ok(())
    }
}
