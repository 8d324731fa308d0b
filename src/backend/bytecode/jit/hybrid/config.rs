//! Configuration and statistics for hybrid JIT/VM execution.

use std::fmt;

use serde::Deserialize;

use super::super::compiler::CompileOptions;
use super::super::engine::OptLevel;
use crate::backend::bytecode::vm::VmConfig;

/// Which blocks the executor may compile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompilePolicy {
    /// Only the program's per-sample compute block
    #[default]
    ComputeOnly,
    /// Any block whose caller passes a compile hint
    Hinted,
    /// Interpret everything
    Never,
}

/// Error loading a configuration file
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// TOML syntax or schema error
    Parse(String),
    /// Value outside its valid range
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Invalid configuration: {}", msg),
            ConfigError::Invalid(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Hybrid executor configuration
///
/// Every field has a default, so a configuration file only needs the keys
/// it changes:
///
/// ```toml
/// policy = "hinted"
/// opt_level = "speed_and_size"
/// keep_ir = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    pub policy: CompilePolicy,
    pub opt_level: OptLevel,
    /// Run the Cranelift verifier on every compiled block
    pub verify: bool,
    /// Keep the generated IR text on compiled blocks
    pub keep_ir: bool,
    /// Operand stack limit, shared by the interpreter and the compiler
    pub max_stack_depth: usize,
    /// Compile the compute block when the executor is created
    pub eager_compile: bool,
    /// Whether to enable execution tracing
    pub trace: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            policy: CompilePolicy::default(),
            opt_level: OptLevel::default(),
            verify: true,
            keep_ir: false,
            max_stack_depth: 512,
            eager_compile: true,
            trace: false,
        }
    }
}

impl HybridConfig {
    pub fn with_policy(mut self, policy: CompilePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_opt_level(mut self, opt_level: OptLevel) -> Self {
        self.opt_level = opt_level;
        self
    }

    /// Create a configuration with tracing enabled
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Create a configuration that never compiles
    pub fn interpreter_only() -> Self {
        Self {
            policy: CompilePolicy::Never,
            eager_compile: false,
            ..Default::default()
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: HybridConfig =
            toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if config.max_stack_depth == 0 {
            return Err(ConfigError::Invalid(
                "max_stack_depth must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn vm_config(&self) -> VmConfig {
        VmConfig {
            max_stack_depth: self.max_stack_depth,
            trace: self.trace,
        }
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            opt_level: self.opt_level,
            verify: self.verify,
            keep_ir: self.keep_ir,
            max_stack_depth: self.max_stack_depth,
        }
    }
}

/// Statistics for hybrid execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HybridStats {
    /// Total number of executed blocks
    pub runs: u64,
    /// Runs that used native code
    pub native_runs: u64,
    /// Runs that used the interpreter
    pub interpreted_runs: u64,
    /// Native runs abandoned for the interpreter because the frame did not
    /// fit the compiled block
    pub native_bailouts: u64,
    /// Number of successful compilations
    pub compilations: u64,
    /// Number of failed compilations
    pub failures: u64,
}

impl HybridStats {
    /// Get the native hit rate as a percentage
    pub fn jit_hit_rate(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            (self.native_runs as f64 / self.runs as f64) * 100.0
        }
    }

    /// Get the failure rate as a percentage of compile attempts
    pub fn failure_rate(&self) -> f64 {
        let attempts = self.compilations + self.failures;
        if attempts == 0 {
            0.0
        } else {
            (self.failures as f64 / attempts as f64) * 100.0
        }
    }
}
