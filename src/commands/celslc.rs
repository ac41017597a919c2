//! Command line of `celslc`, which turns a structure model into phase-grating slices

use super::{check_range, require_path, ArgumentError, Program, Stage};
use crate::parameters::Bounds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const PROGRAM: &str = "celslc";

const HIGH_TENSION: Bounds = Bounds::closed(10.0, 1300.0);
const LATERAL_SAMPLING: Bounds = Bounds::closed(32.0, 2048.0);
const SLICE_COUNT: Bounds = Bounds::closed(1.0, 2048.0);

/// Switches of `celslc` without a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CelslcSwitch {
    /// Reverse the slice stacking order
    Reverse,
    /// Frozen-lattice variants; disables the Debye-Waller factors
    FrozenLattice,
    /// Debye-Waller factors
    DebyeWaller,
    /// Absorption potentials
    Absorption,
    /// Export the projected potentials to `*.pot` files
    Potentials,
    /// 3D potential simulation
    ThreeDimensionalPotential,
    /// Store projected potentials instead of phase gratings in the slice files
    PotentialSlices,
    /// Report the run time
    RunTime,
    /// Suppress console output
    Silent,
}

impl CelslcSwitch {
    pub fn flag(&self) -> &'static str {
        match self {
            CelslcSwitch::Reverse => "-rev",
            CelslcSwitch::FrozenLattice => "-fl",
            CelslcSwitch::DebyeWaller => "-dwf",
            CelslcSwitch::Absorption => "-abs",
            CelslcSwitch::Potentials => "-pot",
            CelslcSwitch::ThreeDimensionalPotential => "-3dp",
            CelslcSwitch::PotentialSlices => "-pps",
            CelslcSwitch::RunTime => "-rti",
            CelslcSwitch::Silent => "-silent",
        }
    }
}

/// Invocation of `celslc` on a CEL or CIF structure file
///
/// The structure flag (`-cel` or `-cif`) follows the file extension.
/// Sampling is required unless the potential is read from an external 3D
/// potential file, whose header defines it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelslcCommand {
    pub structure: PathBuf,
    /// Slice file name stem
    pub slice_name: PathBuf,
    /// High tension [kV]
    pub high_tension: f64,
    /// Sampling (nx, ny, nz)
    pub sampling: Option<(usize, usize, usize)>,
    /// Number of frozen-lattice variants per slice
    pub variants: Option<usize>,
    /// Absorption factor; requires Debye-Waller factors
    pub absorption_factor: Option<f64>,
    /// Uniform Debye-Waller parameter [nm^2]; requires Debye-Waller factors
    pub uniform_dwf: Option<f64>,
    /// Data column of an external 3D potential file, 10 selecting the 4th column
    pub external_potential: Option<u32>,
    /// Slice to compute, 1-based
    pub single_slice: Option<usize>,
    /// Projection: zone axis, projected x axis and cell size [nm]
    pub projection: Option<[f64; 9]>,
    /// Shift of all atoms in fractional coordinates (x, y, z)
    pub translation: Option<[f64; 3]>,
    pub switches: BTreeSet<CelslcSwitch>,
}

impl CelslcCommand {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(
        structure: P,
        slice_name: Q,
        high_tension: f64,
    ) -> Self {
        Self {
            structure: structure.into(),
            slice_name: slice_name.into(),
            high_tension,
            sampling: None,
            variants: None,
            absorption_factor: None,
            uniform_dwf: None,
            external_potential: None,
            single_slice: None,
            projection: None,
            translation: None,
            switches: BTreeSet::new(),
        }
    }

    pub fn with_sampling(mut self, nx: usize, ny: usize, nz: usize) -> Self {
        self.sampling = Some((nx, ny, nz));
        self
    }

    pub fn with_variants(mut self, variants: usize) -> Self {
        self.variants = Some(variants);
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

    pub fn with_external_potential(mut self, column: u32) -> Self {
        self.external_potential = Some(column);
        self
    }

    pub fn with_single_slice(mut self, slice: usize) -> Self {
        self.single_slice = Some(slice);
        self
    }

    pub fn with_projection(mut self, projection: [f64; 9]) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn with_translation(mut self, translation: [f64; 3]) -> Self {
        self.translation = Some(translation);
        self
    }

    pub fn with_switch(mut self, switch: CelslcSwitch) -> Self {
        self.switches.insert(switch);
        self
    }

    fn has(&self, switch: CelslcSwitch) -> bool {
        self.switches.contains(&switch)
    }

    fn requires_dwf(&self, option: &'static str) -> Result<(), ArgumentError> {
        if self.has(CelslcSwitch::DebyeWaller) {
            Ok(())
        } else {
            Err(ArgumentError::Requires {
                program: PROGRAM,
                option,
                required: "dwf",
            })
        }
    }
}

fn structure_flag(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("cif") => "-cif",
        _ => "-cel",
    }
}

fn join(values: &[f64]) -> String {
    values.iter().map(f64::to_string).collect::<Vec<_>>().join(",")
}

impl Stage for CelslcCommand {
    fn program(&self) -> Program {
        Program::Celslc
    }

    fn arguments(&self) -> Result<Vec<String>, ArgumentError> {
        let structure = require_path(PROGRAM, "structure", &self.structure)?;
        let slice_name = require_path(PROGRAM, "slc", &self.slice_name)?;
        check_range(PROGRAM, "ht", self.high_tension, HIGH_TENSION)?;

        let mut args = vec![
            structure_flag(&self.structure).to_string(),
            structure,
            "-slc".to_string(),
            slice_name,
        ];

        match (self.sampling, self.external_potential) {
            (Some((nx, ny, nz)), _) => {
                check_range(PROGRAM, "nx", nx as f64, LATERAL_SAMPLING)?;
                check_range(PROGRAM, "ny", ny as f64, LATERAL_SAMPLING)?;
                check_range(PROGRAM, "nz", nz as f64, SLICE_COUNT)?;
                args.extend([
                    "-nx".to_string(),
                    nx.to_string(),
                    "-ny".to_string(),
                    ny.to_string(),
                    "-nz".to_string(),
                    nz.to_string(),
                ]);
            }
            (None, Some(_)) => {}
            (None, None) => {
                return Err(ArgumentError::Missing {
                    program: PROGRAM,
                    argument: "nx/ny/nz",
                })
            }
        }

        args.extend(["-ht".to_string(), self.high_tension.to_string()]);

        if self.has(CelslcSwitch::Reverse) {
            args.push(CelslcSwitch::Reverse.flag().to_string());
        }
        if self.has(CelslcSwitch::FrozenLattice) {
            args.push(CelslcSwitch::FrozenLattice.flag().to_string());
        }
        if let Some(variants) = self.variants {
            check_range(PROGRAM, "nv", variants as f64, SLICE_COUNT)?;
            args.extend(["-nv".to_string(), variants.to_string()]);
        }
        if self.has(CelslcSwitch::DebyeWaller) {
            args.push(CelslcSwitch::DebyeWaller.flag().to_string());
        }
        if let Some(biso) = self.uniform_dwf {
            self.requires_dwf("buni")?;
            check_range(PROGRAM, "buni", biso, Bounds::min_only(0.0))?;
            args.extend(["-buni".to_string(), biso.to_string()]);
        }
        if self.has(CelslcSwitch::Absorption) {
            self.requires_dwf("abs")?;
            args.push(CelslcSwitch::Absorption.flag().to_string());
        }
        if let Some(factor) = self.absorption_factor {
            self.requires_dwf("abf")?;
            check_range(PROGRAM, "abf", factor, Bounds::min_only(0.0))?;
            args.extend(["-abf".to_string(), factor.to_string()]);
        }
        if self.has(CelslcSwitch::Potentials) {
            args.push(CelslcSwitch::Potentials.flag().to_string());
        }
        if self.has(CelslcSwitch::ThreeDimensionalPotential) {
            args.push(CelslcSwitch::ThreeDimensionalPotential.flag().to_string());
        }
        if let Some(column) = self.external_potential {
            args.extend(["-inf".to_string(), column.to_string()]);
        }
        if self.has(CelslcSwitch::PotentialSlices) {
            args.push(CelslcSwitch::PotentialSlices.flag().to_string());
        }
        if let Some(slice) = self.single_slice {
            let last = self.sampling.map_or(f64::INFINITY, |(_, _, nz)| nz as f64);
            let bounds = Bounds::new(1.0, last).map_err(|source| ArgumentError::Invalid {
                program: PROGRAM,
                argument: "ssc",
                reason: source.to_string(),
            })?;
            check_range(PROGRAM, "ssc", slice as f64, bounds)?;
            args.extend(["-ssc".to_string(), slice.to_string()]);
        }
        if self.has(CelslcSwitch::RunTime) {
            args.push(CelslcSwitch::RunTime.flag().to_string());
        }
        if self.has(CelslcSwitch::Silent) {
            args.push(CelslcSwitch::Silent.flag().to_string());
        }
        if let Some(projection) = &self.projection {
            for value in projection {
                check_range(PROGRAM, "prj", *value, Bounds::unbounded())?;
            }
            args.extend(["-prj".to_string(), join(projection)]);
        }
        if let Some(translation) = &self.translation {
            for value in translation {
                check_range(PROGRAM, "tla", *value, Bounds::unbounded())?;
            }
            args.extend(["-tla".to_string(), join(translation)]);
        }

        Ok(args)
    }

    fn output_paths(&self) -> Vec<PathBuf> {
        vec![self.slice_name.clone()]
    }
}
