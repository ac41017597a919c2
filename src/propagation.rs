//! Multislice propagation parameters
//!
//! [`PropagationParameters`] models the parameter file read by `msa`. The file
//! is split into a microscope section and a multislice section and ends with
//! the object's slice sequence:
//!
//! ```text
//! '[Microscope Parameters]'
//! 30.0 ! Semi angle of convergence [mrad]
//! ...
//! '[Multislice Parameters]'
//! ...
//! 10   ! Number of slices in the object.
//! 0    ! Slice ID
//! ...
//! End of parameter file.
//! ```

use crate::aberration::{self, aberrations_field, Aberration};
use crate::parameters::{
    parameter_fields, Bounds, Constraint, FieldDescriptor, FieldKind, FieldType, FieldValue,
    ParameterFile, RecordLayout, RecordLine, Slot, Switched, TokenType, ValidationError,
};
use rand::Rng;
use serde::{Deserialize, Serialize};

const POSITIVE: Constraint = Constraint::Range(Bounds::min_only(1.0));
const NON_NEGATIVE: Constraint = Constraint::Range(Bounds::min_only(0.0));

const MICROSCOPE_SECTION: FieldDescriptor =
    FieldDescriptor::heading("microscope_section", "'[Microscope Parameters]'", true);

const CONV_SEMI_ANGLE: FieldDescriptor = FieldDescriptor::new(
    "conv_semi_angle",
    FieldKind::OneOf(&[&[Slot::Real], &[Slot::Real, Slot::Real, Slot::Real]]),
    "Semi angle of convergence [mrad]",
);

const INNER_RADIUS_ANN_DET: FieldDescriptor = FieldDescriptor::new(
    "inner_radius_ann_det",
    FieldKind::Real,
    "Inner radius of the annular detector [mrad]",
);

const OUTER_RADIUS_ANN_DET: FieldDescriptor = FieldDescriptor::new(
    "outer_radius_ann_det",
    FieldKind::Real,
    "Outer radius of the annular detector [mrad]",
);

const DETECTOR: FieldDescriptor = FieldDescriptor::new(
    "detector",
    FieldKind::FlagGroup {
        choices: &[0, 1],
        params: &[Slot::Text],
    },
    "Detector definition file, switch and file name",
);

const WAVELENGTH: FieldDescriptor =
    FieldDescriptor::new("wavelength", FieldKind::Real, "Electron wavelength [nm]");

const SOURCE_RADIUS: FieldDescriptor = FieldDescriptor::new(
    "source_radius",
    FieldKind::Real,
    "De-magnified source radius (1/e half width) [nm]",
);

const FOCUS_SPREAD: FieldDescriptor =
    FieldDescriptor::new("focus_spread", FieldKind::Real, "Focus spread [nm]");

const FOCUS_SPREAD_KERNEL_HW: FieldDescriptor = FieldDescriptor::new(
    "focus_spread_kernel_hw",
    FieldKind::Real,
    "Focus-spread kernel half-width w.r.t. the focus spread",
);

const FOCUS_SPREAD_KERNEL_SIZE: FieldDescriptor = FieldDescriptor::new(
    "focus_spread_kernel_size",
    FieldKind::Integer,
    "Focus-spread kernel size",
)
.with_constraint(POSITIVE);

const ABERRATIONS: FieldDescriptor =
    aberrations_field("Number of aberration definitions following");

const MULTISLICE_SECTION: FieldDescriptor =
    FieldDescriptor::heading("multislice_section", "'[Multislice Parameters]'", true);

const TILT_X: FieldDescriptor = FieldDescriptor::new(
    "tilt_x",
    FieldKind::Real,
    "Object tilt X [deg]. Approximative approach. Do not use for tilts larger than 5 degrees.",
);

const TILT_Y: FieldDescriptor = FieldDescriptor::new(
    "tilt_y",
    FieldKind::Real,
    "Object tilt Y [deg]. Approximative approach. Do not use for tilts larger than 5 degrees.",
);

const H_SCAN_OFFSET: FieldDescriptor = FieldDescriptor::new(
    "h_scan_offset",
    FieldKind::Real,
    "Horizontal scan frame offset [nm].",
);

const V_SCAN_OFFSET: FieldDescriptor = FieldDescriptor::new(
    "v_scan_offset",
    FieldKind::Real,
    "Vertical scan frame offset [nm].",
);

const H_SCAN_FRAME_SIZE: FieldDescriptor = FieldDescriptor::new(
    "h_scan_frame_size",
    FieldKind::Real,
    "Horizontal scan frame size [nm].",
);

const V_SCAN_FRAME_SIZE: FieldDescriptor = FieldDescriptor::new(
    "v_scan_frame_size",
    FieldKind::Real,
    "Vertical scan frame size [nm].",
);

const SCAN_FRAME_ROT: FieldDescriptor = FieldDescriptor::new(
    "scan_frame_rot",
    FieldKind::Real,
    "Scan frame rotation [deg] w.r.t. the slice data.",
);

const SCAN_COLUMNS: FieldDescriptor = FieldDescriptor::new(
    "scan_columns",
    FieldKind::Integer,
    "Number of scan columns = number of pixels on horizontal scan image axis.",
)
.with_constraint(NON_NEGATIVE);

const SCAN_ROWS: FieldDescriptor = FieldDescriptor::new(
    "scan_rows",
    FieldKind::Integer,
    "Number of scan rows = number of pixels on vertical scan image axis.",
)
.with_constraint(NON_NEGATIVE);

const TEMP_COHERENCE_FLAG: FieldDescriptor = FieldDescriptor::new(
    "temp_coherence_flag",
    FieldKind::Flag(&[0, 1]),
    "Switch for partial temporal coherence calculation. Drastic increase of calculation time if activated.",
);

const SPAT_COHERENCE_FLAG: FieldDescriptor = FieldDescriptor::new(
    "spat_coherence_flag",
    FieldKind::Flag(&[0, 1]),
    "Switch for partial spatial coherence calculation. Is only applied in combination with an input image file.",
);

const SUPER_CELL_X: FieldDescriptor = FieldDescriptor::new(
    "super_cell_x",
    FieldKind::Integer,
    "Supercell repeat factor in horizontal direction, x.",
)
.with_constraint(POSITIVE);

const SUPER_CELL_Y: FieldDescriptor = FieldDescriptor::new(
    "super_cell_y",
    FieldKind::Integer,
    "Supercell repeat factor in vertical direction, y.",
)
.with_constraint(POSITIVE);

const SUPER_CELL_Z: FieldDescriptor = FieldDescriptor::new(
    "super_cell_z",
    FieldKind::Integer,
    "Supercell repeat factor in Z-direction, obsolete.",
)
.with_constraint(POSITIVE);

const SLICE_FILES: FieldDescriptor = FieldDescriptor::new(
    "slice_files",
    FieldKind::Text,
    "Slice file series name [SFN]. Expected file names are [SFN]+'_###.sli' where ### is a three digit number.",
);

const NUMBER_OF_SLICES: FieldDescriptor = FieldDescriptor::new(
    "number_of_slices",
    FieldKind::Integer,
    "Number of slice files to load.",
)
.with_constraint(POSITIVE);

const NUMBER_FROZEN_LATTICE: FieldDescriptor = FieldDescriptor::new(
    "number_frozen_lattice",
    FieldKind::Integer,
    "Number of frozen lattice variants per slice.",
)
.with_constraint(POSITIVE);

const MIN_NUM_FROZEN: FieldDescriptor = FieldDescriptor::new(
    "min_num_frozen",
    FieldKind::Integer,
    "Minimum number of frozen lattice variations averaged per scan pixel in STEM mode.",
)
.with_constraint(POSITIVE);

const DET_READOUT_PERIOD: FieldDescriptor = FieldDescriptor::new(
    "det_readout_period",
    FieldKind::Integer,
    "Detector readout period in slices.",
)
.with_constraint(NON_NEGATIVE);

const SLICE_SEQUENCE: FieldDescriptor = FieldDescriptor::new(
    "slice_sequence",
    FieldKind::Records(RecordLayout {
        lines: &[RecordLine {
            slots: &[Slot::Int],
            comment: "Slice ID",
        }],
        label: None,
    }),
    "Number of slices in the object.",
)
.with_constraint(NON_NEGATIVE);

const END_OF_FILE: FieldDescriptor =
    FieldDescriptor::heading("end_of_file", "End of parameter file.", false);

const LAYOUT: &[FieldDescriptor] = &[
    MICROSCOPE_SECTION,
    CONV_SEMI_ANGLE,
    INNER_RADIUS_ANN_DET,
    OUTER_RADIUS_ANN_DET,
    DETECTOR,
    WAVELENGTH,
    SOURCE_RADIUS,
    FOCUS_SPREAD,
    FOCUS_SPREAD_KERNEL_HW,
    FOCUS_SPREAD_KERNEL_SIZE,
    ABERRATIONS,
    MULTISLICE_SECTION,
    TILT_X,
    TILT_Y,
    H_SCAN_OFFSET,
    V_SCAN_OFFSET,
    H_SCAN_FRAME_SIZE,
    V_SCAN_FRAME_SIZE,
    SCAN_FRAME_ROT,
    SCAN_COLUMNS,
    SCAN_ROWS,
    TEMP_COHERENCE_FLAG,
    SPAT_COHERENCE_FLAG,
    SUPER_CELL_X,
    SUPER_CELL_Y,
    SUPER_CELL_Z,
    SLICE_FILES,
    NUMBER_OF_SLICES,
    NUMBER_FROZEN_LATTICE,
    MIN_NUM_FROZEN,
    DET_READOUT_PERIOD,
    SLICE_SEQUENCE,
    END_OF_FILE,
];

/// Probe convergence semi angle [mrad]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Convergence {
    /// Round condenser aperture
    Symmetric(f64),
    /// Three-value form for an asymmetric aperture
    Asymmetric(f64, f64, f64),
}

impl FieldType for Convergence {
    fn to_field(&self) -> FieldValue {
        match *self {
            Convergence::Symmetric(angle) => angle.to_field(),
            Convergence::Asymmetric(a, b, c) => (a, b, c).to_field(),
        }
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value.tokens()? {
            [angle] => Some(Convergence::Symmetric(f64::from_token(angle)?)),
            [a, b, c] => Some(Convergence::Asymmetric(
                f64::from_token(a)?,
                f64::from_token(b)?,
                f64::from_token(c)?,
            )),
            _ => None,
        }
    }
}

/// Slice IDs repeating the slice stack: `0, 1, .., n-1, 0, 1, ..`
///
/// # Examples
///
/// ```
/// use drprobe_rs::propagation::periodic_slice_sequence;
///
/// assert_eq!(periodic_slice_sequence(3, 7), vec![0, 1, 2, 0, 1, 2, 0]);
/// ```
pub fn periodic_slice_sequence(number_of_slices: usize, total: usize) -> Vec<usize> {
    if number_of_slices == 0 {
        return Vec::new();
    }
    (0..total).map(|i| i % number_of_slices).collect()
}

/// Sorted divisors of `n`, square roots listed twice
fn factors(n: usize) -> Vec<usize> {
    let mut factors = Vec::new();
    let mut i = 1;
    while i * i <= n {
        if n % i == 0 {
            factors.push(i);
            factors.push(n / i);
        }
        i += 1;
    }
    factors.sort_unstable();
    factors
}

/// Slice IDs built from randomly placed contiguous windows of the slice stack
///
/// An object thinner than the stack is one window starting at a random slice.
/// A thicker object is split into equal windows whose length is the median
/// divisor of `total`; each window starts at a random slice and wraps around
/// the stack.
pub fn random_slice_sequence<R: Rng + ?Sized>(
    number_of_slices: usize,
    total: usize,
    rng: &mut R,
) -> Vec<usize> {
    if number_of_slices == 0 || total == 0 {
        return Vec::new();
    }

    if total < number_of_slices {
        let lo = rng.gen_range(0..number_of_slices - total);
        return (lo..lo + total).map(|i| i % number_of_slices).collect();
    }

    let divisors = factors(total);
    let window = divisors
        .get((divisors.len() + 1) / 2)
        .copied()
        .unwrap_or(total);

    let mut sequence = Vec::with_capacity(total);
    for _ in 0..total / window {
        let lo = if number_of_slices > window {
            rng.gen_range(0..number_of_slices - window)
        } else {
            0
        };
        sequence.extend((lo..lo + window).map(|i| i % number_of_slices));
    }
    sequence
}

/// Parameters of the `msa` multislice stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropagationParameters {
    conv_semi_angle: Convergence,
    inner_radius_ann_det: f64,
    outer_radius_ann_det: f64,
    detector: Switched<String>,
    wavelength: f64,
    source_radius: f64,
    focus_spread: f64,
    focus_spread_kernel_hw: f64,
    focus_spread_kernel_size: usize,
    aberrations: Vec<Aberration>,
    tilt_x: f64,
    tilt_y: f64,
    h_scan_offset: f64,
    v_scan_offset: f64,
    h_scan_frame_size: f64,
    v_scan_frame_size: f64,
    scan_frame_rot: f64,
    scan_columns: usize,
    scan_rows: usize,
    temp_coherence_flag: i64,
    spat_coherence_flag: i64,
    super_cell_x: usize,
    super_cell_y: usize,
    super_cell_z: usize,
    slice_files: String,
    number_of_slices: usize,
    number_frozen_lattice: usize,
    min_num_frozen: usize,
    det_readout_period: usize,
    slice_sequence: Vec<usize>,
}

impl Default for PropagationParameters {
    fn default() -> Self {
        Self {
            conv_semi_angle: Convergence::Symmetric(30.0),
            inner_radius_ann_det: 0.0,
            outer_radius_ann_det: 30.0,
            detector: Switched::new(0, "prm/msa_det.prm".to_string()),
            wavelength: 0.00417571,
            source_radius: 0.01,
            focus_spread: 3.0,
            focus_spread_kernel_hw: 2.0,
            focus_spread_kernel_size: 7,
            aberrations: Vec::new(),
            tilt_x: 0.0,
            tilt_y: 0.0,
            h_scan_offset: 0.0,
            v_scan_offset: 0.0,
            h_scan_frame_size: 1.0,
            v_scan_frame_size: 1.0,
            scan_frame_rot: 0.0,
            scan_columns: 0,
            scan_rows: 0,
            temp_coherence_flag: 0,
            spat_coherence_flag: 1,
            super_cell_x: 1,
            super_cell_y: 1,
            super_cell_z: 1,
            slice_files: "slc/slices".to_string(),
            number_of_slices: 5,
            number_frozen_lattice: 1,
            min_num_frozen: 1,
            det_readout_period: 1,
            slice_sequence: periodic_slice_sequence(5, 10),
        }
    }
}

parameter_fields! {
    PropagationParameters {
        /// Probe convergence semi angle [mrad]
        conv_semi_angle / set_conv_semi_angle: Convergence => CONV_SEMI_ANGLE;
        inner_radius_ann_det / set_inner_radius_ann_det: f64 => INNER_RADIUS_ANN_DET;
        outer_radius_ann_det / set_outer_radius_ann_det: f64 => OUTER_RADIUS_ANN_DET;
        /// Detector definition switch and file
        detector / set_detector: Switched<String> => DETECTOR;
        /// Electron wavelength [nm]
        wavelength / set_wavelength: f64 => WAVELENGTH;
        source_radius / set_source_radius: f64 => SOURCE_RADIUS;
        focus_spread / set_focus_spread: f64 => FOCUS_SPREAD;
        focus_spread_kernel_hw / set_focus_spread_kernel_hw: f64 => FOCUS_SPREAD_KERNEL_HW;
        focus_spread_kernel_size / set_focus_spread_kernel_size: usize => FOCUS_SPREAD_KERNEL_SIZE;
        aberrations / set_aberrations: Vec<Aberration> => ABERRATIONS;
        /// Object tilt along x [deg]
        tilt_x / set_tilt_x: f64 => TILT_X;
        /// Object tilt along y [deg]
        tilt_y / set_tilt_y: f64 => TILT_Y;
        h_scan_offset / set_h_scan_offset: f64 => H_SCAN_OFFSET;
        v_scan_offset / set_v_scan_offset: f64 => V_SCAN_OFFSET;
        h_scan_frame_size / set_h_scan_frame_size: f64 => H_SCAN_FRAME_SIZE;
        v_scan_frame_size / set_v_scan_frame_size: f64 => V_SCAN_FRAME_SIZE;
        scan_frame_rot / set_scan_frame_rot: f64 => SCAN_FRAME_ROT;
        scan_columns / set_scan_columns: usize => SCAN_COLUMNS;
        scan_rows / set_scan_rows: usize => SCAN_ROWS;
        temp_coherence_flag / set_temp_coherence_flag: i64 => TEMP_COHERENCE_FLAG;
        spat_coherence_flag / set_spat_coherence_flag: i64 => SPAT_COHERENCE_FLAG;
        super_cell_x / set_super_cell_x: usize => SUPER_CELL_X;
        super_cell_y / set_super_cell_y: usize => SUPER_CELL_Y;
        super_cell_z / set_super_cell_z: usize => SUPER_CELL_Z;
        /// Slice file series name
        slice_files / set_slice_files: String => SLICE_FILES;
        /// Number of slice files in the stack
        number_of_slices / set_number_of_slices: usize => NUMBER_OF_SLICES;
        number_frozen_lattice / set_number_frozen_lattice: usize => NUMBER_FROZEN_LATTICE;
        min_num_frozen / set_min_num_frozen: usize => MIN_NUM_FROZEN;
        det_readout_period / set_det_readout_period: usize => DET_READOUT_PERIOD;
        /// Slice IDs of the object from entrance to exit
        slice_sequence / set_slice_sequence: Vec<usize> => SLICE_SEQUENCE;
    }
}

impl PropagationParameters {
    /// Parameters with every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slices in the object
    pub fn total_number_of_slices(&self) -> usize {
        self.slice_sequence.len()
    }

    pub fn number_of_aberrations(&self) -> usize {
        self.aberrations.len()
    }

    /// Aberration with `index`, if defined
    pub fn aberration(&self, index: usize) -> Option<&Aberration> {
        self.aberrations.iter().find(|a| a.index == index)
    }

    /// Set or replace the aberration with the same index
    pub fn set_aberration(&mut self, aberration: Aberration) -> Result<(), ValidationError> {
        self.set_aberrations(aberration::upsert(&self.aberrations, aberration))
    }

    /// Remove the aberration with `index`, returning it
    pub fn remove_aberration(&mut self, index: usize) -> Option<Aberration> {
        let position = self.aberrations.iter().position(|a| a.index == index)?;
        Some(self.aberrations.remove(position))
    }

    pub fn clear_aberrations(&mut self) {
        self.aberrations.clear();
    }

    /// Object of `total` slices cycling through the slice stack
    pub fn set_periodic_slices(&mut self, total: usize) -> Result<(), ValidationError> {
        self.set_slice_sequence(periodic_slice_sequence(self.number_of_slices, total))
    }

    /// Object of `total` slices built from random windows of the slice stack
    pub fn set_random_slices<R: Rng + ?Sized>(
        &mut self,
        total: usize,
        rng: &mut R,
    ) -> Result<(), ValidationError> {
        self.set_slice_sequence(random_slice_sequence(self.number_of_slices, total, rng))
    }
}

impl ParameterFile for PropagationParameters {
    const FORMAT: &'static str = "msa";

    fn layout() -> &'static [FieldDescriptor] {
        LAYOUT
    }

    fn get(&self, name: &str) -> Option<FieldValue> {
        self.field_value(name)
    }

    fn set(&mut self, name: &str, value: &FieldValue) -> Result<(), ValidationError> {
        self.apply_field(name, value)
    }

    fn check_invariants(&self) -> Result<(), ValidationError> {
        match self
            .slice_sequence
            .iter()
            .find(|&&id| id >= self.number_of_slices)
        {
            Some(id) => Err(ValidationError::Invariant {
                field: SLICE_SEQUENCE.name,
                message: format!(
                    "slice ID {} is not below the number of slice files ({})",
                    id, self.number_of_slices
                ),
            }),
            None => Ok(()),
        }
    }
}
