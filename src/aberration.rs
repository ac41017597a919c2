//! Aberration coefficients shared by the `msa` and `wavimg` parameter files
//!
//! Both files carry a count line followed by one line per aberration:
//!
//! ```text
//! 2           ! Number of aberration definitions following this line.
//! 1, 2.0, 0.0 ! defocus
//! 5, 1200.0, 0.0 ! CS
//! ```

use crate::parameters::{
    Bounds, Constraint, FieldDescriptor, FieldKind, Record, RecordLayout, RecordLine, Slot, Token,
    TokenType,
};
use serde::{Deserialize, Serialize};

/// Names of the aberrations known to Dr. Probe, by index
pub const ABERRATION_NAMES: [&str; 12] = [
    "image_shift",
    "defocus",
    "2-fold-astigmatism",
    "coma",
    "3-fold-astigmatism",
    "CS",
    "star_aberration",
    "4-fold-astigmatism",
    "coma(5th)",
    "lobe-aberration",
    "5-fold-astigmatism",
    "C5",
];

/// One aberration: its index and the two coefficient components [nm]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aberration {
    pub index: usize,
    pub x: f64,
    pub y: f64,
}

impl Aberration {
    pub fn new(index: usize, x: f64, y: f64) -> Self {
        Self { index, x, y }
    }

    /// Defocus, `index` 1
    pub fn defocus(value: f64) -> Self {
        Self::new(1, value, 0.0)
    }

    /// Spherical aberration CS, `index` 5
    pub fn spherical(value: f64) -> Self {
        Self::new(5, value, 0.0)
    }

    /// Name written as the line comment
    pub fn name(&self) -> String {
        aberration_name(self.index)
    }
}

/// Name of the aberration with `index`
///
/// # Examples
///
/// ```
/// use drprobe_rs::aberration::aberration_name;
///
/// assert_eq!(aberration_name(1), "defocus");
/// assert_eq!(aberration_name(20), "aberration 20");
/// ```
pub fn aberration_name(index: usize) -> String {
    ABERRATION_NAMES
        .get(index)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("aberration {}", index))
}

impl Record for Aberration {
    fn to_lines(&self) -> Vec<Vec<Token>> {
        vec![vec![self.index.to_token(), self.x.to_token(), self.y.to_token()]]
    }

    fn from_lines(lines: &[Vec<Token>]) -> Option<Self> {
        match lines {
            [line] => match line.as_slice() {
                [index, x, y] => Some(Self {
                    index: usize::from_token(index)?,
                    x: f64::from_token(x)?,
                    y: f64::from_token(y)?,
                }),
                _ => None,
            },
            _ => None,
        }
    }
}

fn label(tokens: &[Token]) -> String {
    match tokens.first() {
        Some(Token::Int(index)) if *index >= 0 => aberration_name(*index as usize),
        _ => String::new(),
    }
}

/// Record layout of an aberration line
pub const ABERRATION_LAYOUT: RecordLayout = RecordLayout {
    lines: &[RecordLine {
        slots: &[Slot::Int, Slot::Real, Slot::Real],
        comment: "",
    }],
    label: Some(label),
};

/// Descriptor of an aberration block; indices must be unique and non-negative
pub const fn aberrations_field(comment: &'static str) -> FieldDescriptor {
    FieldDescriptor::new("aberrations", FieldKind::Records(ABERRATION_LAYOUT), comment)
        .with_constraint(Constraint::Keyed(Bounds::min_only(0.0)))
}

/// Copy of `list` with `aberration` replacing the entry of the same index, or appended
pub(crate) fn upsert(list: &[Aberration], aberration: Aberration) -> Vec<Aberration> {
    let mut next = list.to_vec();
    match next.iter_mut().find(|a| a.index == aberration.index) {
        Some(existing) => *existing = aberration,
        None => next.push(aberration),
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{FieldType, FieldValue, ValidationError};

    const FIELD: FieldDescriptor = aberrations_field("Number of aberration definitions");

    #[test]
    fn test_names() {
        assert_eq!(Aberration::defocus(2.0).name(), "defocus");
        assert_eq!(Aberration::spherical(1200.0).name(), "CS");
        assert_eq!(Aberration::new(11, 0.0, 0.0).name(), "C5");
        assert_eq!(label(&[Token::Int(3)]), "coma");
        assert_eq!(label(&[Token::Int(-3)]), "");
    }

    #[test]
    fn test_record_conversion() {
        let list = vec![Aberration::defocus(2.0), Aberration::new(2, 0.5, -0.5)];
        let value = list.to_field();
        assert_eq!(value.records().unwrap().len(), 2);

        let back: Vec<Aberration> = FieldType::from_field(&value).unwrap();
        assert_eq!(back, list);

        // Real-valued index is not an aberration
        let bad = FieldValue::Records(vec![vec![vec![
            Token::Real(1.0),
            Token::Real(2.0),
            Token::Real(0.0),
        ]]]);
        assert_eq!(<Vec<Aberration>>::from_field(&bad), None);
    }

    #[test]
    fn test_unique_indices() {
        let list = vec![Aberration::defocus(2.0), Aberration::defocus(3.0)];
        match FIELD.validate(&list.to_field()) {
            Err(ValidationError::DuplicateKey { key, .. }) => assert_eq!(key, 1),
            other => panic!("Expected DuplicateKey, got {:?}", other),
        }

        let list = vec![Aberration::new(1, f64::NAN, 0.0)];
        assert!(FIELD.validate(&list.to_field()).is_err());
    }

    #[test]
    fn test_upsert() {
        let list = vec![Aberration::defocus(2.0)];

        let replaced = upsert(&list, Aberration::defocus(-5.0));
        assert_eq!(replaced, vec![Aberration::defocus(-5.0)]);

        let appended = upsert(&list, Aberration::spherical(1200.0));
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[1].index, 5);
    }
}
