//! Command invoker for the Dr. Probe programs
//!
//! Each program is described by a [`Stage`]: a typed set of arguments and
//! options that is validated and turned into a command line. The
//! [`CommandInvoker`] resolves the executable from its [`InvokerConfig`],
//! creates missing output directories, runs the process to completion through
//! a [`ProcessRunner`] and reports a non-zero exit status as
//! [`DrProbeError::SimulationFailure`].
//!
//! ## Example
//!
//! ```no_run
//! use drprobe_rs::commands::{CelslcCommand, CommandInvoker, MsaCommand, MsaSwitch};
//!
//! let invoker = CommandInvoker::new();
//!
//! let slices = CelslcCommand::new("SrTiO3.cel", "slc/STO", 300.0).with_sampling(256, 256, 8);
//! invoker.run(&slices)?;
//!
//! let multislice = MsaCommand::new("prm/msa.prm", "wav/STO.wav").with_switch(MsaSwitch::Ctem);
//! invoker.run(&multislice)?;
//! # Ok::<(), drprobe_rs::DrProbeError>(())
//! ```

mod cellmuncher;
mod celslc;
mod msa;
mod wavimg;

pub use cellmuncher::{Axis, CellMuncherCommand};
pub use celslc::{CelslcCommand, CelslcSwitch};
pub use msa::{MsaCommand, MsaSwitch};
pub use wavimg::{WavimgCommand, WavimgSwitch};

use crate::error::{DrProbeError, Result};
use crate::parameters::Bounds;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Missing or malformed arguments, detected before any process is started
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentError {
    #[error("{program}: missing required argument '{argument}'")]
    Missing {
        program: &'static str,
        argument: &'static str,
    },

    #[error("{program}: invalid value for '{argument}': {reason}")]
    Invalid {
        program: &'static str,
        argument: &'static str,
        reason: String,
    },

    #[error("{program}: option '{option}' requires '{required}'")]
    Requires {
        program: &'static str,
        option: &'static str,
        required: &'static str,
    },
}

/// The external programs of the Dr. Probe package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Program {
    /// Structure file to slice files
    Celslc,
    /// Multislice calculation
    Msa,
    /// Image formation
    Wavimg,
    /// Structure file editing
    CellMuncher,
}

impl Program {
    /// Executable name used when no other name is configured
    pub fn default_name(&self) -> &'static str {
        match self {
            Program::Celslc => "celslc",
            Program::Msa => "msa",
            Program::Wavimg => "wavimg",
            Program::CellMuncher => "CellMuncher",
        }
    }
}

/// A program together with its validated arguments
pub trait Stage {
    fn program(&self) -> Program;

    /// Command-line arguments in their fixed order
    fn arguments(&self) -> std::result::Result<Vec<String>, ArgumentError>;

    /// Files the program writes; their parent directories are created before launch
    fn output_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
}

impl Invocation {
    /// Space separated command line, for display only
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Exit status and captured output of a finished process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CompletionResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Configuration of the command invoker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvokerConfig {
    /// Executable name or path of celslc. Default: "celslc"
    pub celslc: String,

    /// Executable name or path of msa. Default: "msa"
    pub msa: String,

    /// Executable name or path of wavimg. Default: "wavimg"
    pub wavimg: String,

    /// Executable name or path of CellMuncher. Default: "CellMuncher"
    pub cellmuncher: String,

    /// Directory prepended to relative executable names. Default: None (search PATH)
    pub bin_dir: Option<PathBuf>,

    /// Working directory of the launched programs. Default: None (inherited)
    pub working_dir: Option<PathBuf>,

    /// Create missing output directories before launching. Default: true
    pub create_output_dirs: bool,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            celslc: Program::Celslc.default_name().to_string(),
            msa: Program::Msa.default_name().to_string(),
            wavimg: Program::Wavimg.default_name().to_string(),
            cellmuncher: Program::CellMuncher.default_name().to_string(),
            bin_dir: None,
            working_dir: None,
            create_output_dirs: true,
        }
    }
}

impl InvokerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the executable name or path of one program
    pub fn with_program(mut self, program: Program, executable: &str) -> Self {
        let slot = match program {
            Program::Celslc => &mut self.celslc,
            Program::Msa => &mut self.msa,
            Program::Wavimg => &mut self.wavimg,
            Program::CellMuncher => &mut self.cellmuncher,
        };
        *slot = executable.to_string();
        self
    }

    /// Set the directory holding the executables
    pub fn with_bin_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.bin_dir = Some(dir.into());
        self
    }

    /// Set the working directory of the launched programs
    pub fn with_working_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Enable or disable creation of output directories
    pub fn with_create_output_dirs(mut self, enable: bool) -> Self {
        self.create_output_dirs = enable;
        self
    }

    /// Executable path of `program`
    pub fn program_path(&self, program: Program) -> PathBuf {
        let name = match program {
            Program::Celslc => &self.celslc,
            Program::Msa => &self.msa,
            Program::Wavimg => &self.wavimg,
            Program::CellMuncher => &self.cellmuncher,
        };
        match &self.bin_dir {
            Some(dir) if Path::new(name).is_relative() => dir.join(name),
            _ => PathBuf::from(name),
        }
    }
}

/// Runs an invocation to completion
pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CompletionResult>;
}

/// Runs invocations as child processes of the current process
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CompletionResult> {
        let mut command = Command::new(&invocation.program);
        command.args(&invocation.args);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }

        let output = command.output()?;
        Ok(CompletionResult {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Builds and runs the command lines of the Dr. Probe programs
#[derive(Debug, Clone)]
pub struct CommandInvoker<R = SystemRunner> {
    config: InvokerConfig,
    runner: R,
}

impl CommandInvoker<SystemRunner> {
    /// Invoker with the default configuration
    pub fn new() -> Self {
        Self::with_config(InvokerConfig::default())
    }

    pub fn with_config(config: InvokerConfig) -> Self {
        Self {
            config,
            runner: SystemRunner,
        }
    }
}

impl Default for CommandInvoker<SystemRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ProcessRunner> CommandInvoker<R> {
    /// Invoker launching processes through `runner`
    pub fn with_runner(config: InvokerConfig, runner: R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Validate the arguments of `stage` and resolve its command line
    pub fn invocation<S: Stage + ?Sized>(&self, stage: &S) -> Result<Invocation> {
        let args = stage.arguments()?;
        Ok(Invocation {
            program: self.config.program_path(stage.program()),
            args,
            working_dir: self.config.working_dir.clone(),
        })
    }

    /// Run `stage` and wait for it to finish
    ///
    /// Arguments are validated before anything touches the file system or
    /// starts a process.
    pub fn run<S: Stage + ?Sized>(&self, stage: &S) -> Result<CompletionResult> {
        let invocation = self.invocation(stage)?;

        if self.config.create_output_dirs {
            self.create_output_dirs(stage)?;
        }

        info!(command = %invocation.command_line(), "running {}", stage.program().default_name());

        let result = self
            .runner
            .run(&invocation)
            .map_err(|source| DrProbeError::Spawn {
                program: invocation.program.display().to_string(),
                source,
            })?;

        debug!(exit_code = ?result.exit_code, "{} finished", stage.program().default_name());

        if result.success() {
            Ok(result)
        } else {
            warn!(
                exit_code = ?result.exit_code,
                stderr = %result.stderr.trim(),
                "{} failed",
                stage.program().default_name()
            );
            Err(DrProbeError::SimulationFailure {
                program: stage.program().default_name().to_string(),
                result,
            })
        }
    }

    fn create_output_dirs<S: Stage + ?Sized>(&self, stage: &S) -> Result<()> {
        for path in stage.output_paths() {
            let path = match &self.config.working_dir {
                Some(dir) if path.is_relative() => dir.join(path),
                _ => path,
            };

            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                if !parent.is_dir() {
                    debug!(dir = %parent.display(), "creating output directory");
                    fs::create_dir_all(parent).map_err(|source| DrProbeError::Write {
                        path: parent.to_path_buf(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Fail with [`ArgumentError::Missing`] for an empty path or name
pub(crate) fn require_path(
    program: &'static str,
    argument: &'static str,
    path: &Path,
) -> std::result::Result<String, ArgumentError> {
    if path.as_os_str().is_empty() {
        return Err(ArgumentError::Missing { program, argument });
    }
    Ok(path.display().to_string())
}

/// Fail with [`ArgumentError::Invalid`] for a value outside `bounds`
pub(crate) fn check_range(
    program: &'static str,
    argument: &'static str,
    value: f64,
    bounds: Bounds,
) -> std::result::Result<(), ArgumentError> {
    bounds.check(value).map_err(|source| ArgumentError::Invalid {
        program,
        argument,
        reason: source.to_string(),
    })
}
