//! Image-formation parameters
//!
//! [`ImagingParameters`] models the parameter file read by `wavimg`, which
//! turns exit-plane wave functions into simulated TEM images. The file has no
//! section lines; every line holds the values of one field followed by a
//! comment:
//!
//! ```text
//! 'wav/xxx.wav' ! Wave function file name string used to locate existing wave functions. ...
//! 256, 256      ! Dimension of the wave data in pixels, ...
//! ```

use crate::aberration::{self, aberrations_field, Aberration};
use crate::parameters::{
    parameter_fields, Bounds, Constraint, FieldDescriptor, FieldKind, FieldValue, ParameterFile,
    Record, RecordLayout, RecordLine, Slot, Switched, Token, TokenType, ValidationError,
};
use serde::{Deserialize, Serialize};

const WAVE_FILES: FieldDescriptor = FieldDescriptor::new(
    "wave_files",
    FieldKind::Text,
    "Wave function file name string used to locate existing wave functions. Use quotation marks when the string includes space characters.",
);

const WAVE_DIM: FieldDescriptor = FieldDescriptor::new(
    "wave_dim",
    FieldKind::Tuple(&[Slot::Int, Slot::Int]),
    "Dimension of the wave data in pixels, <nx> = number of horizontal wave pixels, <ny> = number of vertical wave pixels.",
)
.with_constraint(Constraint::Range(Bounds::min_only(1.0)));

const WAVE_SAMPLING: FieldDescriptor = FieldDescriptor::new(
    "wave_sampling",
    FieldKind::Tuple(&[Slot::Real, Slot::Real]),
    "Sampling rate of the wave data (<sx> = horizontal, <sy> = vertical) [nm/pix].",
);

const HIGH_TENSION: FieldDescriptor = FieldDescriptor::new(
    "high_tension",
    FieldKind::Real,
    "TEM high-tension used for wave function calculation [kV].",
);

const OUTPUT_FORMAT: FieldDescriptor = FieldDescriptor::new(
    "output_format",
    FieldKind::Flag(&[0, 1, 2, 3, 4, 5, 6]),
    "Image output type option: 0 = TEM image, 1 = complex image plane wave, 2 = wave amplitude, 3 = wave phase, 4 = wave real part, 5 = wave imaginary part, 6 = TEM image map of 2 variables.",
);

const OUTPUT_FILES: FieldDescriptor = FieldDescriptor::new(
    "output_files",
    FieldKind::Text,
    "Image output file name string. Use quotation marks when the string includes space characters.",
);

const OUTPUT_DIM: FieldDescriptor = FieldDescriptor::new(
    "output_dim",
    FieldKind::Tuple(&[Slot::Int, Slot::Int]),
    "Image output size (<ix> = horizontal , <iy> = vertical) in number of pixels.",
)
.with_constraint(Constraint::Range(Bounds::min_only(1.0)));

const NOISE: FieldDescriptor = FieldDescriptor::new(
    "noise",
    FieldKind::FlagGroup {
        choices: &[0, 1, 2],
        params: &[Slot::Real, Slot::Real, Slot::Real],
    },
    "Flag and parameters for creating integer images with optional noise. Flag <intflg> 0 = off (default), 1 = 32-bit, 2 = 16-bit, Parameter: <mean> = mean vacuum intensity, <conv> = electron to counts conversion rate, <rnoise> detector readout rms noise level in counts.",
);

const FLAG_SPEC_FRAME: FieldDescriptor = FieldDescriptor::new(
    "flag_spec_frame",
    FieldKind::Flag(&[0, 1]),
    "Flag activating the extraction of a special image frame (0=OFF, 1=ON). The frame parameters are defined in the lines below.",
);

const OUTPUT_SAMPLING: FieldDescriptor = FieldDescriptor::new(
    "output_sampling",
    FieldKind::Real,
    "Image output sampling rate [nm/pix], isotropic. The parameter is used only if the Flag in line 09 is set to 1.",
);

const IMG_FRAME_OFFSET: FieldDescriptor = FieldDescriptor::new(
    "img_frame_offset",
    FieldKind::Tuple(&[Slot::Real, Slot::Real]),
    "Image frame offset in pixels of the input wave. The parameter is used only if the Flag in line 09 is set to 1.",
);

const IMG_ROT: FieldDescriptor = FieldDescriptor::new(
    "img_rot",
    FieldKind::Real,
    "Image frame rotation in [deg] with respect to the input wave horizontal axis. The parameter is used only if the Flag in line 09 is set to 1.",
);

const COHERENCE_MODEL: FieldDescriptor = FieldDescriptor::new(
    "coherence_model",
    FieldKind::Flag(&[1, 2, 3, 4, 5]),
    "Coherence calculation model switch: 1 = averaging of coherent sub images explicit focal variation but quasi-coherent spatial envelope, 2 = averaging of coherent sub images with explicit focal and angular variation, 3 = quasi-coherent linear envelopes, 4 = Fourier-space synthesis with  partially coherent TCC, 5: averaging of coherent sub images with explicit  focal, angular, and frozen lattice variation).",
);

const TEMP_COHERENCE: FieldDescriptor = FieldDescriptor::new(
    "temp_coherence",
    FieldKind::FlagGroup {
        choices: &[0, 1],
        params: &[Slot::Real],
    },
    "Flag and parameters for partial temporal coherence: <ptcflg> = flag (0=OFF, 1=ON), <f-spread> = focus spread (1/e) half width [nm].",
);

const SPAT_COHERENCE: FieldDescriptor = FieldDescriptor::new(
    "spat_coherence",
    FieldKind::FlagGroup {
        choices: &[0, 1],
        params: &[Slot::Real],
    },
    "Flag and parameters for partial spatial coherence: <pscflg> = flag (0=OFF, 1=ON), <s-conv> = beam convergence (1/e) half width [mrad].",
);

const MTF: FieldDescriptor = FieldDescriptor::new(
    "mtf",
    FieldKind::FlagGroup {
        choices: &[0, 1],
        params: &[Slot::Real, Slot::Text],
    },
    "Flag and parameters for applying the detector MTF: <mtfflag> = flag (0=OFF, 1=ON), <mtf-scale> = calculation scale of the mtf = (sampling rate experiment)/(sampling rate simulation), <mtf-file> = File name string to locate the MTF data. Use quotation marks when the string includes space characters.",
);

const VIBRATION: FieldDescriptor = FieldDescriptor::new(
    "vibration",
    FieldKind::FlagGroup {
        choices: &[0, 1, 2],
        params: &[Slot::Real, Slot::Real, Slot::Real],
    },
    "Flag and parameters for a vibration envelope: <vibflg> = flag (0=OFF, 1=ON-ISO, 2=ON-ANISO), <vibprm1>, <vibprm1> = vibration RMS amplitudes [nm], <vibprm3> = orientation [deg] of the primary vibration amplitude w.r.t. the horizontal image axis.",
);

const ABERRATIONS: FieldDescriptor =
    aberrations_field("Number of aberration definitions following this line.");

const OA_RADIUS: FieldDescriptor = FieldDescriptor::new(
    "oa_radius",
    FieldKind::Real,
    "Objective aperture radius [mrad]. Set to very large values to deactivate.",
);

const OA_POSITION: FieldDescriptor = FieldDescriptor::new(
    "oa_position",
    FieldKind::Tuple(&[Slot::Real, Slot::Real]),
    "Center of the objective aperture with respect to the zero beam [mrad].",
);

const LOOP_LAYOUT: RecordLayout = RecordLayout {
    lines: &[
        RecordLine {
            slots: &[Slot::Int],
            comment: "Loop parameter class switch.",
        },
        RecordLine {
            slots: &[Slot::Int],
            comment: "Loop parameter switch within the class.",
        },
        RecordLine {
            slots: &[Slot::Int],
            comment: "Loop variation form switch.",
        },
        RecordLine {
            slots: &[Slot::Real, Slot::Real, Slot::Int],
            comment: "Loop range: first value, last value, number of samples.",
        },
        RecordLine {
            slots: &[Slot::Text],
            comment: "Loop name string used in the output file names.",
        },
    ],
    label: None,
};

const LOOPS: FieldDescriptor = FieldDescriptor::new(
    "loops",
    FieldKind::Records(LOOP_LAYOUT),
    "Number variable of loop definitions following below.",
)
.with_constraint(Constraint::Slots(&[
    Some(Bounds::min_only(1.0)),
    Some(Bounds::min_only(0.0)),
    Some(Bounds::min_only(1.0)),
    None,
    None,
    Some(Bounds::min_only(1.0)),
]));

const LAYOUT: &[FieldDescriptor] = &[
    WAVE_FILES,
    WAVE_DIM,
    WAVE_SAMPLING,
    HIGH_TENSION,
    OUTPUT_FORMAT,
    OUTPUT_FILES,
    OUTPUT_DIM,
    NOISE,
    FLAG_SPEC_FRAME,
    OUTPUT_SAMPLING,
    IMG_FRAME_OFFSET,
    IMG_ROT,
    COHERENCE_MODEL,
    TEMP_COHERENCE,
    SPAT_COHERENCE,
    MTF,
    VIBRATION,
    ABERRATIONS,
    OA_RADIUS,
    OA_POSITION,
    LOOPS,
];

/// A loop over one imaging parameter, producing a series of images
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDefinition {
    /// Parameter class
    pub class: i64,
    /// Parameter within the class
    pub variable: i64,
    /// Variation form
    pub form: i64,
    pub start: f64,
    pub stop: f64,
    pub samples: usize,
    /// Name inserted into the output file names
    pub label: String,
}

impl LoopDefinition {
    /// Linear loop over an aberration coefficient, e.g. a focal series
    pub fn aberration_series(
        index: usize,
        start: f64,
        stop: f64,
        samples: usize,
        label: &str,
    ) -> Self {
        Self {
            class: 1,
            variable: index as i64,
            form: 1,
            start,
            stop,
            samples,
            label: label.to_string(),
        }
    }
}

impl Record for LoopDefinition {
    fn to_lines(&self) -> Vec<Vec<Token>> {
        vec![
            vec![self.class.to_token()],
            vec![self.variable.to_token()],
            vec![self.form.to_token()],
            vec![self.start.to_token(), self.stop.to_token(), self.samples.to_token()],
            vec![self.label.to_token()],
        ]
    }

    fn from_lines(lines: &[Vec<Token>]) -> Option<Self> {
        match lines {
            [class, variable, form, range, label] => match (
                class.as_slice(),
                variable.as_slice(),
                form.as_slice(),
                range.as_slice(),
                label.as_slice(),
            ) {
                ([class], [variable], [form], [start, stop, samples], [label]) => Some(Self {
                    class: i64::from_token(class)?,
                    variable: i64::from_token(variable)?,
                    form: i64::from_token(form)?,
                    start: f64::from_token(start)?,
                    stop: f64::from_token(stop)?,
                    samples: usize::from_token(samples)?,
                    label: String::from_token(label)?,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

/// Parameters of the `wavimg` image-formation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagingParameters {
    wave_files: String,
    wave_dim: (usize, usize),
    wave_sampling: (f64, f64),
    high_tension: f64,
    output_format: i64,
    output_files: String,
    output_dim: (usize, usize),
    noise: Switched<(f64, f64, f64)>,
    flag_spec_frame: i64,
    output_sampling: f64,
    img_frame_offset: (f64, f64),
    img_rot: f64,
    coherence_model: i64,
    temp_coherence: Switched<f64>,
    spat_coherence: Switched<f64>,
    mtf: Switched<(f64, String)>,
    vibration: Switched<(f64, f64, f64)>,
    aberrations: Vec<Aberration>,
    oa_radius: f64,
    oa_position: (f64, f64),
    loops: Vec<LoopDefinition>,
}

impl Default for ImagingParameters {
    fn default() -> Self {
        Self {
            wave_files: "wav/xxx.wav".to_string(),
            wave_dim: (256, 256),
            wave_sampling: (0.0, 0.0),
            high_tension: 80.0,
            output_format: 1,
            output_files: "img/xxx.dat".to_string(),
            output_dim: (256, 256),
            noise: Switched::new(0, (1.0, 1.0, 0.0)),
            flag_spec_frame: 0,
            output_sampling: 0.0,
            img_frame_offset: (0.0, 0.0),
            img_rot: 0.0,
            coherence_model: 1,
            temp_coherence: Switched::new(1, 0.5),
            spat_coherence: Switched::new(1, 0.4),
            mtf: Switched::new(1, (1.0, "PICO-US4k-080_mtf_bin1_4096.mtf".to_string())),
            vibration: Switched::new(1, (0.022, 0.022, 0.0)),
            aberrations: Vec::new(),
            oa_radius: 15.0,
            oa_position: (0.0, 0.0),
            loops: Vec::new(),
        }
    }
}

parameter_fields! {
    ImagingParameters {
        /// Wave function file name
        wave_files / set_wave_files: String => WAVE_FILES;
        /// Wave dimension in pixels (nx, ny)
        wave_dim / set_wave_dim: (usize, usize) => WAVE_DIM;
        /// Wave sampling (sx, sy) [nm/pix]
        wave_sampling / set_wave_sampling: (f64, f64) => WAVE_SAMPLING;
        /// High tension [kV]
        high_tension / set_high_tension: f64 => HIGH_TENSION;
        /// Image output type, 0..=6
        output_format / set_output_format: i64 => OUTPUT_FORMAT;
        /// Image output file name
        output_files / set_output_files: String => OUTPUT_FILES;
        /// Image output size in pixels (ix, iy)
        output_dim / set_output_dim: (usize, usize) => OUTPUT_DIM;
        /// Integer image flag with mean intensity, conversion rate and readout noise
        noise / set_noise: Switched<(f64, f64, f64)> => NOISE;
        flag_spec_frame / set_flag_spec_frame: i64 => FLAG_SPEC_FRAME;
        output_sampling / set_output_sampling: f64 => OUTPUT_SAMPLING;
        img_frame_offset / set_img_frame_offset: (f64, f64) => IMG_FRAME_OFFSET;
        img_rot / set_img_rot: f64 => IMG_ROT;
        /// Coherence calculation model, 1..=5
        coherence_model / set_coherence_model: i64 => COHERENCE_MODEL;
        /// Temporal coherence flag and focus spread [nm]
        temp_coherence / set_temp_coherence: Switched<f64> => TEMP_COHERENCE;
        /// Spatial coherence flag and beam convergence [mrad]
        spat_coherence / set_spat_coherence: Switched<f64> => SPAT_COHERENCE;
        /// Detector MTF flag, scale and file
        mtf / set_mtf: Switched<(f64, String)> => MTF;
        /// Vibration envelope flag, amplitudes [nm] and orientation [deg]
        vibration / set_vibration: Switched<(f64, f64, f64)> => VIBRATION;
        aberrations / set_aberrations: Vec<Aberration> => ABERRATIONS;
        /// Objective aperture radius [mrad]
        oa_radius / set_oa_radius: f64 => OA_RADIUS;
        oa_position / set_oa_position: (f64, f64) => OA_POSITION;
        loops / set_loops: Vec<LoopDefinition> => LOOPS;
    }
}

impl ImagingParameters {
    /// Parameters with every field at its default
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of aberration lines written to the file
    pub fn number_of_aberrations(&self) -> usize {
        self.aberrations.len()
    }

    /// Number of loop definitions written to the file
    pub fn number_of_loops(&self) -> usize {
        self.loops.len()
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

    /// Append a loop definition
    pub fn add_loop(&mut self, definition: LoopDefinition) -> Result<(), ValidationError> {
        let mut loops = self.loops.clone();
        loops.push(definition);
        self.set_loops(loops)
    }
}

impl ParameterFile for ImagingParameters {
    const FORMAT: &'static str = "wavimg";

    fn layout() -> &'static [FieldDescriptor] {
        LAYOUT
    }

    fn get(&self, name: &str) -> Option<FieldValue> {
        self.field_value(name)
    }

    fn set(&mut self, name: &str, value: &FieldValue) -> Result<(), ValidationError> {
        self.apply_field(name, value)
    }
}
