//! Command line of `msa`, the multislice program

use super::{check_range, require_path, ArgumentError, Program, Stage};
use crate::parameters::Bounds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

const PROGRAM: &str = "msa";

/// Switches of `msa` without a value, in command-line order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MsaSwitch {
    /// Plane-wave (CTEM) calculation instead of STEM
    Ctem,
    TxtOut,
    ThreeDOut,
    /// Gaussian source profile
    GaussAp,
    /// Write the exit-plane wave functions
    Wave,
    /// Write the averaged wave functions
    AvWave,
    DetImg,
    Verbose,
    Debug,
    /// Large-angle probe
    Lapro,
    WaveFt,
    AvWaveFt,
    /// Probe diffraction pattern
    Pdif,
    /// Probe image
    Pimg,
    /// Elastic partial coherence
    Epc,
    /// Averaged probe diffraction pattern
    Padif,
    SilAvWave,
    SilAvWaveFt,
    Silent,
    /// Report the run time
    RunTime,
}

impl MsaSwitch {
    pub fn flag(&self) -> &'static str {
        match self {
            MsaSwitch::Ctem => "/ctem",
            MsaSwitch::TxtOut => "/txtout",
            MsaSwitch::ThreeDOut => "/3dout",
            MsaSwitch::GaussAp => "/gaussap",
            MsaSwitch::Wave => "/wave",
            MsaSwitch::AvWave => "/avwave",
            MsaSwitch::DetImg => "/detimg",
            MsaSwitch::Verbose => "/verbose",
            MsaSwitch::Debug => "/debug",
            MsaSwitch::Lapro => "/lapro",
            MsaSwitch::WaveFt => "/waveft",
            MsaSwitch::AvWaveFt => "/avwaveft",
            MsaSwitch::Pdif => "/pdif",
            MsaSwitch::Pimg => "/pimg",
            MsaSwitch::Epc => "/epc",
            MsaSwitch::Padif => "/padif",
            MsaSwitch::SilAvWave => "/silavwave",
            MsaSwitch::SilAvWaveFt => "/silavwaveft",
            MsaSwitch::Silent => "/silent",
            MsaSwitch::RunTime => "/rti",
        }
    }
}

/// Invocation of `msa` on a parameter file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MsaCommand {
    pub prm: PathBuf,
    pub output: PathBuf,
    /// Input wave function replacing the probe
    pub input_wave: Option<PathBuf>,
    /// Input wave function inserted at a slice number
    pub inserted_wave: Option<(PathBuf, usize)>,
    /// Scan pixel of a single calculation (px, py)
    pub scan_pixel: Option<(usize, usize)>,
    /// Last scan pixel of a scan window (lx, ly)
    pub last_pixel: Option<(usize, usize)>,
    /// Defocus override [nm]
    pub defocus: Option<f64>,
    /// Probe tilt override [mrad]
    pub tilt: Option<(f64, f64)>,
    /// Object tilt [deg]
    pub object_tilt: Option<(f64, f64)>,
    /// Effective source radius [nm]
    pub source_radius: Option<f64>,
    /// Absorption factor
    pub absorption_factor: Option<f64>,
    /// Uniform Debye-Waller parameter [nm^2]
    pub uniform_dwf: Option<f64>,
    /// Uniform frozen-lattice displacement [nm]
    pub uniform_displacement: Option<f64>,
    /// Vortex probe orbital angular momentum
    pub vortex: Option<i64>,
    /// Detector definition file
    pub detector_slices: Option<PathBuf>,
    /// Number of k-space momenta and their range
    pub momenta: Option<(usize, f64)>,
    pub switches: BTreeSet<MsaSwitch>,
}

impl MsaCommand {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(prm: P, output: Q) -> Self {
        Self {
            prm: prm.into(),
            output: output.into(),
            ..Self::default()
        }
    }

    pub fn with_input_wave<P: Into<PathBuf>>(mut self, wave: P) -> Self {
        self.input_wave = Some(wave.into());
        self
    }

    pub fn with_inserted_wave<P: Into<PathBuf>>(mut self, wave: P, slice: usize) -> Self {
        self.inserted_wave = Some((wave.into(), slice));
        self
    }

    /// Calculate only the scan pixel (px, py)
    pub fn with_scan_pixel(mut self, px: usize, py: usize) -> Self {
        self.scan_pixel = Some((px, py));
        self
    }

    /// Calculate the scan window from the scan pixel to (lx, ly)
    pub fn with_last_pixel(mut self, lx: usize, ly: usize) -> Self {
        self.last_pixel = Some((lx, ly));
        self
    }

    pub fn with_defocus(mut self, defocus: f64) -> Self {
        self.defocus = Some(defocus);
        self
    }

    pub fn with_tilt(mut self, x: f64, y: f64) -> Self {
        self.tilt = Some((x, y));
        self
    }

    pub fn with_object_tilt(mut self, x: f64, y: f64) -> Self {
        self.object_tilt = Some((x, y));
        self
    }

    pub fn with_source_radius(mut self, radius: f64) -> Self {
        self.source_radius = Some(radius);
        self
    }

    pub fn with_absorption_factor(mut self, factor: f64) -> Self {
        self.absorption_factor = Some(factor);
        self
    }

    pub fn with_uniform_dwf(mut self, biso: f64) -> Self {
        self.uniform_dwf = Some(biso);
        self
    }

    pub fn with_uniform_displacement(mut self, displacement: f64) -> Self {
        self.uniform_displacement = Some(displacement);
        self
    }

    pub fn with_vortex(mut self, momentum: i64) -> Self {
        self.vortex = Some(momentum);
        self
    }

    pub fn with_detector_slices<P: Into<PathBuf>>(mut self, file: P) -> Self {
        self.detector_slices = Some(file.into());
        self
    }

    pub fn with_momenta(mut self, count: usize, range: f64) -> Self {
        self.momenta = Some((count, range));
        self
    }

    pub fn with_switch(mut self, switch: MsaSwitch) -> Self {
        self.switches.insert(switch);
        self
    }
}

fn push_pair(
    args: &mut Vec<String>,
    names: [&'static str; 2],
    values: (f64, f64),
) -> Result<(), ArgumentError> {
    check_range(PROGRAM, names[0].trim_start_matches('-'), values.0, Bounds::unbounded())?;
    check_range(PROGRAM, names[1].trim_start_matches('-'), values.1, Bounds::unbounded())?;
    args.extend([
        names[0].to_string(),
        values.0.to_string(),
        names[1].to_string(),
        values.1.to_string(),
    ]);
    Ok(())
}

impl Stage for MsaCommand {
    fn program(&self) -> Program {
        Program::Msa
    }

    fn arguments(&self) -> Result<Vec<String>, ArgumentError> {
        let mut args = vec![
            "-prm".to_string(),
            require_path(PROGRAM, "prm", &self.prm)?,
            "-out".to_string(),
            require_path(PROGRAM, "out", &self.output)?,
        ];

        if let Some(wave) = &self.input_wave {
            args.extend(["-in".to_string(), require_path(PROGRAM, "in", wave)?]);
        }
        if let Some((wave, slice)) = &self.inserted_wave {
            check_range(PROGRAM, "inw", *slice as f64, Bounds::min_only(1.0))?;
            args.extend([
                "-inw".to_string(),
                require_path(PROGRAM, "inw", wave)?,
                slice.to_string(),
            ]);
        }

        match (self.scan_pixel, self.last_pixel) {
            (None, Some(_)) => {
                return Err(ArgumentError::Requires {
                    program: PROGRAM,
                    option: "lx/ly",
                    required: "px/py",
                })
            }
            (Some((px, py)), last) => {
                args.extend([
                    "-px".to_string(),
                    px.to_string(),
                    "-py".to_string(),
                    py.to_string(),
                ]);
                if let Some((lx, ly)) = last {
                    check_range(PROGRAM, "lx", lx as f64, Bounds::min_only(px as f64))?;
                    check_range(PROGRAM, "ly", ly as f64, Bounds::min_only(py as f64))?;
                    args.extend([
                        "-lx".to_string(),
                        lx.to_string(),
                        "-ly".to_string(),
                        ly.to_string(),
                    ]);
                }
            }
            (None, None) => {}
        }

        if let Some(defocus) = self.defocus {
            check_range(PROGRAM, "foc", defocus, Bounds::unbounded())?;
            args.extend(["-foc".to_string(), defocus.to_string()]);
        }
        if let Some(tilt) = self.tilt {
            push_pair(&mut args, ["-tx", "-ty"], tilt)?;
        }
        if let Some(tilt) = self.object_tilt {
            push_pair(&mut args, ["-otx", "-oty"], tilt)?;
        }
        if let Some(radius) = self.source_radius {
            check_range(PROGRAM, "sr", radius, Bounds::min_only(0.0))?;
            args.extend(["-sr".to_string(), radius.to_string()]);
        }
        if let Some(factor) = self.absorption_factor {
            check_range(PROGRAM, "abf", factor, Bounds::min_only(0.0))?;
            args.extend(["-abf".to_string(), factor.to_string()]);
        }
        if let Some(biso) = self.uniform_dwf {
            check_range(PROGRAM, "buni", biso, Bounds::min_only(0.0))?;
            args.extend(["-buni".to_string(), biso.to_string()]);
        }
        if let Some(displacement) = self.uniform_displacement {
            check_range(PROGRAM, "uuni", displacement, Bounds::min_only(0.0))?;
            args.extend(["-uuni".to_string(), displacement.to_string()]);
        }
        if let Some(momentum) = self.vortex {
            args.extend(["/vtx".to_string(), momentum.to_string()]);
        }
        if let Some(file) = &self.detector_slices {
            args.extend(["-detslc".to_string(), require_path(PROGRAM, "detslc", file)?]);
        }
        if let Some((count, range)) = self.momenta {
            check_range(PROGRAM, "kmom", count as f64, Bounds::min_only(1.0))?;
            check_range(PROGRAM, "kmom", range, Bounds::min_only(0.0))?;
            args.extend(["-kmom".to_string(), count.to_string(), range.to_string()]);
        }

        args.extend(self.switches.iter().map(|s| s.flag().to_string()));
        Ok(args)
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.output.clone()]
    }
}
