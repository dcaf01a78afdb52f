use crate::config::ToolchainConfig;
use crate::error::HarnessError;
use log::debug;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Exit status of a compile or execute step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessResult {
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self { code: Some(code) }
    }

    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for ProcessResult {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Builds and runs harness programs.
pub trait Toolchain {
    fn compile(&mut self, source: &Path, binary: &Path) -> Result<ProcessResult, HarnessError>;

    fn execute(&mut self, binary: &Path) -> Result<ProcessResult, HarnessError>;
}

/// Native compiler and process execution. Output streams are inherited so
/// diagnostics and assertion messages reach the terminal.
#[derive(Debug, Clone)]
pub struct SystemToolchain {
    config: ToolchainConfig,
    include_dir: PathBuf,
}

impl SystemToolchain {
    pub fn new(config: ToolchainConfig, include_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            include_dir: include_dir.into(),
        }
    }
}

impl Toolchain for SystemToolchain {
    fn compile(&mut self, source: &Path, binary: &Path) -> Result<ProcessResult, HarnessError> {
        let args = self.config.compile_args(&self.include_dir, source, binary);
        debug!("{} {}", self.config.compiler, args.join(" "));
        let status = Command::new(&self.config.compiler)
            .args(&args)
            .status()
            .map_err(HarnessError::io(Path::new(&self.config.compiler)))?;
        Ok(status.into())
    }

    fn execute(&mut self, binary: &Path) -> Result<ProcessResult, HarnessError> {
        debug!("running {}", binary.display());
        let status = Command::new(binary)
            .status()
            .map_err(HarnessError::io(binary))?;
        Ok(status.into())
    }
}
