//! # Parameter System
//!
//! Building blocks shared by the parameter-file models: a [`FieldDescriptor`]
//! declares one named entry of a file, the [`codec`] reads and writes its
//! line(s) and [`ParameterFile`] assembles an ordered descriptor list into a
//! loadable, saveable model.
//!
//! ## Core Components
//!
//! - [`Bounds`]: inclusive numeric ranges checked on every assignment
//! - [`FieldDescriptor`] and [`FieldKind`]: the shape, constraint and comment of a field
//! - [`FieldValue`] and [`FieldType`]: untyped field values and their typed conversions
//! - [`Switched`]: a flag followed by parameters that are always written
//! - [`ParameterFile`]: named access, load/save and JSON export
//!
//! ## Example Usage
//!
//! ```rust
//! use drprobe_rs::parameters::{FieldValue, ParameterFile};
//! use drprobe_rs::ImagingParameters;
//!
//! let mut params = ImagingParameters::new();
//!
//! // Typed access
//! params.set_output_dim((512, 512)).unwrap();
//! assert_eq!(params.output_dim(), &(512, 512));
//!
//! // Named access
//! params.set("high_tension", &FieldValue::real(300.0)).unwrap();
//! assert_eq!(params.high_tension(), &300.0);
//!
//! // Rejected values leave the field unchanged
//! assert!(params.set("coherence_model", &FieldValue::int(9)).is_err());
//! assert_eq!(params.coherence_model(), &1);
//! ```

pub mod bounds;
pub mod codec;
pub mod field;
pub mod file;


// Re-export key types
pub use bounds::{Bounds, BoundsError};
pub use codec::StructuralError;
pub use field::{
    Constraint, FieldDescriptor, FieldKind, FieldType, FieldValue, Record, RecordLayout,
    RecordLine, Slot, Switched, Token, TokenType, ValidationError,
};
pub use file::{ParameterFile, ParseError};

pub(crate) use file::parameter_fields;
