//! Parameter files
//!
//! The [`ParameterFile`] trait turns an ordered list of [`FieldDescriptor`]s
//! into a complete model of one parameter file. Implementors only provide the
//! layout and named access to their fields; parsing, rendering, file I/O and
//! JSON export are shared.

use crate::error::{DrProbeError, Result};
use crate::parameters::codec::{self, LineCursor, StructuralError};
use crate::parameters::field::{FieldDescriptor, FieldValue, ValidationError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// A structural error located in a parameter file
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line} ({field}): {source}")]
pub struct ParseError {
    /// 1-based line number
    pub line: usize,
    /// Field being read when the error occurred
    pub field: &'static str,
    #[source]
    pub source: StructuralError,
}

/// A parameter file with a fixed line layout
pub trait ParameterFile: Sized + Default + Serialize + DeserializeOwned {
    /// Name of the file format, used in log output
    const FORMAT: &'static str;

    /// Ordered descriptors, one per line group of the file
    fn layout() -> &'static [FieldDescriptor];

    /// Current value of a field
    fn get(&self, name: &str) -> Option<FieldValue>;

    /// Assign a field, validating it first; the model is unchanged on error
    fn set(&mut self, name: &str, value: &FieldValue) -> std::result::Result<(), ValidationError>;

    /// Invariants spanning several fields, checked before saving
    fn check_invariants(&self) -> std::result::Result<(), ValidationError> {
        Ok(())
    }

    /// Descriptor of a value-bearing field
    fn descriptor(name: &str) -> Option<&'static FieldDescriptor> {
        Self::layout()
            .iter()
            .find(|descriptor| descriptor.has_value() && descriptor.name == name)
    }

    /// Names of all value-bearing fields in file order
    fn field_names() -> Vec<&'static str> {
        Self::layout()
            .iter()
            .filter(|descriptor| descriptor.has_value())
            .map(|descriptor| descriptor.name)
            .collect()
    }

    /// Validate every field and the cross-field invariants
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        for descriptor in Self::layout().iter().filter(|d| d.has_value()) {
            let value = self.get(descriptor.name).ok_or(ValidationError::UnknownField {
                name: descriptor.name.to_string(),
            })?;
            descriptor.validate(&value)?;
        }
        self.check_invariants()
    }

    /// Parse the text of a parameter file
    ///
    /// Every field is assigned through [`ParameterFile::set`] on a fresh
    /// default model, which is only returned once all fields were read.
    fn from_prm_str(text: &str) -> std::result::Result<Self, ParseError> {
        let mut model = Self::default();
        let mut cursor = LineCursor::new(text);

        for descriptor in Self::layout() {
            let line = cursor.next_line_number();
            let value = codec::parse(descriptor, &mut cursor).map_err(|error| ParseError {
                line: error.line,
                field: descriptor.name,
                source: error.error,
            })?;

            if let Some(value) = value {
                model
                    .set(descriptor.name, &value)
                    .map_err(|error| ParseError {
                        line,
                        field: descriptor.name,
                        source: StructuralError::Invalid(error),
                    })?;
            }
        }

        let trailing = cursor.remaining();
        if trailing > 0 {
            debug!(format = Self::FORMAT, trailing, "ignoring lines after the parameter layout");
        }

        Ok(model)
    }

    /// Render the model in the parameter file format
    fn to_prm_string(&self) -> std::result::Result<String, ValidationError> {
        self.validate()?;

        let mut lines = Vec::new();
        for descriptor in Self::layout() {
            let value = if descriptor.has_value() {
                self.get(descriptor.name)
            } else {
                None
            };
            lines.extend(codec::render(descriptor, value.as_ref())?);
        }

        Ok(codec::align(&lines))
    }

    /// Load a parameter file from disk
    fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => DrProbeError::NotFound {
                path: path.to_path_buf(),
            },
            _ => DrProbeError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let model = Self::from_prm_str(&text).map_err(|source| DrProbeError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        info!(format = Self::FORMAT, path = %path.display(), "loaded parameter file");
        Ok(model)
    }

    /// Save the model to disk, creating missing parent directories
    ///
    /// A failed save may leave a partially written file behind.
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_prm_string()?;

        let write_error = |source| DrProbeError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, text).map_err(write_error)?;

        info!(format = Self::FORMAT, path = %path.display(), "saved parameter file");
        Ok(())
    }

    /// Serialize the model to pretty-printed JSON
    fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize a model from JSON, validating every field
    fn from_json(json: &str) -> Result<Self> {
        let model: Self = serde_json::from_str(json)?;
        model.validate()?;
        Ok(model)
    }
}

/// Generate typed accessors and the named field table of a model
///
/// Every entry names the struct field, its setter, its type and its
/// descriptor. Getters return a reference; setters validate against the
/// descriptor before assigning. The generated `field_value` and `apply_field`
/// back the [`ParameterFile`] `get`/`set` implementation.
macro_rules! parameter_fields {
    ($model:ident {
        $(
            $(#[$meta:meta])*
            $field:ident / $setter:ident : $ty:ty => $descriptor:path;
        )*
    }) => {
        impl $model {
            $(
                $(#[$meta])*
                pub fn $field(&self) -> &$ty {
                    &self.$field
                }

                $(#[$meta])*
                pub fn $setter(
                    &mut self,
                    value: $ty,
                ) -> ::std::result::Result<(), $crate::parameters::ValidationError> {
                    $descriptor.validate(&$crate::parameters::FieldType::to_field(&value))?;
                    self.$field = value;
                    Ok(())
                }
            )*

            fn field_value(&self, name: &str) -> Option<$crate::parameters::FieldValue> {
                match name {
                    $(
                        name if name == $descriptor.name => {
                            Some($crate::parameters::FieldType::to_field(&self.$field))
                        }
                    )*
                    _ => None,
                }
            }

            fn apply_field(
                &mut self,
                name: &str,
                value: &$crate::parameters::FieldValue,
            ) -> ::std::result::Result<(), $crate::parameters::ValidationError> {
                match name {
                    $(
                        name if name == $descriptor.name => {
                            $descriptor.validate(value)?;
                            self.$field = <$ty as $crate::parameters::FieldType>::from_field(value)
                                .ok_or_else(|| $crate::parameters::ValidationError::Shape {
                                    field: $descriptor.name,
                                    expected: $descriptor.kind.describe(),
                                })?;
                            Ok(())
                        }
                    )*
                    _ => Err($crate::parameters::ValidationError::UnknownField {
                        name: name.to_string(),
                    }),
                }
            }
        }
    };
}

pub(crate) use parameter_fields;
