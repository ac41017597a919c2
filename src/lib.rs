//! # drprobe-rs
//!
//! `drprobe-rs` reads, edits and writes the parameter files of the Dr. Probe
//! electron-microscopy simulation programs and runs those programs.
//!
//! The library provides:
//! - [`PropagationParameters`]: the multislice (`msa`) parameter file
//! - [`ImagingParameters`]: the image-formation (`wavimg`) parameter file
//! - A field-descriptor based parameter system with range validation on every write
//! - A [`CommandInvoker`] building validated command lines for `celslc`, `msa`,
//!   `wavimg` and `CellMuncher`
//!
//! ## Basic Usage
//!
//! ```no_run
//! use drprobe_rs::commands::{CommandInvoker, WavimgCommand};
//! use drprobe_rs::parameters::ParameterFile;
//! use drprobe_rs::ImagingParameters;
//!
//! let mut params = ImagingParameters::load("prm/wavimg.prm")?;
//! params.set_output_dim((256, 256))?;
//! params.save("prm/wavimg.prm")?;
//!
//! let invoker = CommandInvoker::new();
//! let command = WavimgCommand::new("prm/wavimg.prm").output("img/image.dat");
//! invoker.run(&command)?;
//! # Ok::<(), drprobe_rs::DrProbeError>(())
//! ```

// Public modules
pub mod error;

// Parameter system
pub mod parameters;

// Parameter file models
pub mod aberration;
pub mod imaging;
pub mod propagation;

// External programs
pub mod commands;

// Re-exports for convenience
pub use aberration::Aberration;
pub use commands::{CommandInvoker, CompletionResult, InvokerConfig};
pub use error::{DrProbeError, Result};
pub use imaging::{ImagingParameters, LoopDefinition};
pub use propagation::{Convergence, PropagationParameters};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
