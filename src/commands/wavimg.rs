//! Command line of `wavimg`, the image-formation program

use super::{check_range, require_path, ArgumentError, Program, Stage};
use crate::imaging::ImagingParameters;
use crate::parameters::Bounds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

const PROGRAM: &str = "wavimg";

/// Switches of `wavimg` without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WavimgSwitch {
    /// Suppress console output
    Silent,
    /// Debug output
    Debug,
    /// Linear image calculation only
    NoNonlinear,
    /// Re-seed the noise generator
    ReseedNoise,
    /// Report the run time
    RunTime,
}

impl WavimgSwitch {
    pub fn flag(&self) -> &'static str {
        match self {
            WavimgSwitch::Silent => "/sil",
            WavimgSwitch::Debug => "/dbg",
            WavimgSwitch::NoNonlinear => "/nli",
            WavimgSwitch::ReseedNoise => "/rnsb",
            WavimgSwitch::RunTime => "/rti",
        }
    }
}

/// Invocation of `wavimg` on a parameter file
///
/// The output file is mandatory; it overrides the name stored in the
/// parameter file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WavimgCommand {
    pub prm: PathBuf,
    pub output: Option<PathBuf>,
    /// Defocus override [nm]
    pub defocus: Option<f64>,
    /// Beam tilt override [mrad]
    pub beam_tilt: Option<(f64, f64)>,
    /// Objective aperture radius override [mrad]
    pub aperture_radius: Option<f64>,
    /// Side-band shift [1/nm]
    pub side_band_shift: Option<(f64, f64)>,
    pub switches: BTreeSet<WavimgSwitch>,
}

impl WavimgCommand {
    pub fn new<P: Into<PathBuf>>(prm: P) -> Self {
        Self {
            prm: prm.into(),
            ..Self::default()
        }
    }

    /// Command for a parameter file at `prm` holding `params`, writing to its output name
    pub fn from_parameters<P: Into<PathBuf>>(prm: P, params: &ImagingParameters) -> Self {
        let command = Self::new(prm);
        if params.output_files().is_empty() {
            command
        } else {
            command.output(params.output_files().as_str())
        }
    }

    /// Set the output file name
    pub fn output<P: Into<PathBuf>>(mut self, output: P) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_defocus(mut self, defocus: f64) -> Self {
        self.defocus = Some(defocus);
        self
    }

    pub fn with_beam_tilt(mut self, x: f64, y: f64) -> Self {
        self.beam_tilt = Some((x, y));
        self
    }

    pub fn with_aperture_radius(mut self, radius: f64) -> Self {
        self.aperture_radius = Some(radius);
        self
    }

    pub fn with_side_band_shift(mut self, x: f64, y: f64) -> Self {
        self.side_band_shift = Some((x, y));
        self
    }

    pub fn with_switch(mut self, switch: WavimgSwitch) -> Self {
        self.switches.insert(switch);
        self
    }
}

impl Stage for WavimgCommand {
    fn program(&self) -> Program {
        Program::Wavimg
    }

    fn arguments(&self) -> Result<Vec<String>, ArgumentError> {
        let mut args = vec!["-prm".to_string(), require_path(PROGRAM, "prm", &self.prm)?];

        let output = self.output.as_deref().ok_or(ArgumentError::Missing {
            program: PROGRAM,
            argument: "output",
        })?;
        args.push("-out".to_string());
        args.push(require_path(PROGRAM, "output", output)?);

        if let Some(defocus) = self.defocus {
            check_range(PROGRAM, "foc", defocus, Bounds::unbounded())?;
            args.extend(["-foc".to_string(), defocus.to_string()]);
        }
        if let Some((x, y)) = self.beam_tilt {
            check_range(PROGRAM, "btx", x, Bounds::unbounded())?;
            check_range(PROGRAM, "bty", y, Bounds::unbounded())?;
            args.extend(["-btx".to_string(), x.to_string(), "-bty".to_string(), y.to_string()]);
        }
        if let Some(radius) = self.aperture_radius {
            check_range(PROGRAM, "oar", radius, Bounds::min_only(0.0))?;
            args.extend(["-oar".to_string(), radius.to_string()]);
        }
        if let Some((x, y)) = self.side_band_shift {
            check_range(PROGRAM, "sbshx", x, Bounds::unbounded())?;
            check_range(PROGRAM, "sbshy", y, Bounds::unbounded())?;
            args.extend([
                "-sbshx".to_string(),
                x.to_string(),
                "-sbshy".to_string(),
                y.to_string(),
            ]);
        }

        args.extend(self.switches.iter().map(|s| s.flag().to_string()));
        Ok(args)
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        self.output.iter().cloned().collect()
    }
}
