//! Field descriptors
//!
//! A [`FieldDescriptor`] declares one named entry of a parameter file: the
//! shape of the line(s) it occupies, the constraint its values must satisfy and
//! the comment written after the values. The ordered list of descriptors of a
//! model is the line layout expected by the external program.
//!
//! Values travel between the typed models and the line codec as
//! [`FieldValue`]s. The [`FieldType`] trait converts between the two.

use crate::parameters::bounds::{Bounds, BoundsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when a value is assigned to a field
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown field '{name}'")]
    UnknownField { name: String },

    #[error("field '{field}' is a section marker and holds no value")]
    NoValue { field: &'static str },

    #[error("field '{field}': expected {expected}")]
    Shape { field: &'static str, expected: String },

    #[error("field '{field}': {value} is not one of {choices:?}")]
    NotAChoice {
        field: &'static str,
        value: i64,
        choices: &'static [i64],
    },

    #[error("field '{field}': {source}")]
    Bounds {
        field: &'static str,
        #[source]
        source: BoundsError,
    },

    #[error("field '{field}': duplicate record key {key}")]
    DuplicateKey { field: &'static str, key: i64 },

    #[error("field '{field}': string {value:?} cannot be written ({reason})")]
    Text {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("field '{field}': {message}")]
    Invariant { field: &'static str, message: String },
}

/// Type of a single value position on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Int,
    Real,
    Text,
}

impl Slot {
    /// Human readable name used in error messages
    pub fn describe(&self) -> &'static str {
        match self {
            Slot::Int => "integer",
            Slot::Real => "real number",
            Slot::Text => "string",
        }
    }

    /// Whether `token` has the type this slot expects
    pub fn accepts(&self, token: &Token) -> bool {
        matches!(
            (self, token),
            (Slot::Int, Token::Int(_)) | (Slot::Real, Token::Real(_)) | (Slot::Text, Token::Text(_))
        )
    }
}

/// A single typed value read from or written to a line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Int(i64),
    Real(f64),
    Text(String),
}

/// The value of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Values of a single line
    Line(Vec<Token>),

    /// Repeated records; each record is a list of lines, each line a list of tokens
    Records(Vec<Vec<Vec<Token>>>),
}

impl FieldValue {
    /// Single integer value
    pub fn int(value: i64) -> Self {
        FieldValue::Line(vec![Token::Int(value)])
    }

    /// Single real value
    pub fn real(value: f64) -> Self {
        FieldValue::Line(vec![Token::Real(value)])
    }

    /// Single string value
    pub fn text(value: &str) -> Self {
        FieldValue::Line(vec![Token::Text(value.to_string())])
    }

    /// Tokens of a single-line value
    pub fn tokens(&self) -> Option<&[Token]> {
        match self {
            FieldValue::Line(tokens) => Some(tokens),
            FieldValue::Records(_) => None,
        }
    }

    /// Records of a repeated-record value
    pub fn records(&self) -> Option<&[Vec<Vec<Token>>]> {
        match self {
            FieldValue::Records(records) => Some(records),
            FieldValue::Line(_) => None,
        }
    }
}

/// One line of a repeated record
#[derive(Debug, Clone, Copy)]
pub struct RecordLine {
    pub slots: &'static [Slot],
    pub comment: &'static str,
}

/// Shape of a repeated record
#[derive(Clone, Copy)]
pub struct RecordLayout {
    /// Lines making up one record
    pub lines: &'static [RecordLine],

    /// Comment derived from the first line of a record, replacing the static one
    pub label: Option<fn(&[Token]) -> String>,
}

impl fmt::Debug for RecordLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordLayout")
            .field("lines", &self.lines)
            .field("label", &self.label.is_some())
            .finish()
    }
}

/// Semantic kind of a field, fixing the shape of its lines
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    Integer,
    Real,
    /// String, always quoted on output
    Text,
    /// Fixed list of values on one line
    Tuple(&'static [Slot]),
    /// One line matching any of the listed shapes; the first one is canonical
    OneOf(&'static [&'static [Slot]]),
    /// Enumerated integer switch
    Flag(&'static [i64]),
    /// Leading switch followed by parameters that are always written
    FlagGroup {
        choices: &'static [i64],
        params: &'static [Slot],
    },
    /// Count line followed by that many records
    Records(RecordLayout),
    /// Literal section line without a value
    Heading { text: &'static str, required: bool },
}

impl FieldKind {
    /// Accepted single-line shapes; empty for records and headings
    pub fn line_shapes(&self) -> Vec<Vec<Slot>> {
        match self {
            FieldKind::Integer => vec![vec![Slot::Int]],
            FieldKind::Real => vec![vec![Slot::Real]],
            FieldKind::Text => vec![vec![Slot::Text]],
            FieldKind::Tuple(slots) => vec![slots.to_vec()],
            FieldKind::OneOf(shapes) => shapes.iter().map(|s| s.to_vec()).collect(),
            FieldKind::Flag(_) => vec![vec![Slot::Int]],
            FieldKind::FlagGroup { params, .. } => {
                let mut shape = vec![Slot::Int];
                shape.extend_from_slice(params);
                vec![shape]
            }
            FieldKind::Records(_) | FieldKind::Heading { .. } => Vec::new(),
        }
    }

    /// Short description of the expected shape
    pub fn describe(&self) -> String {
        fn shape(slots: &[Slot]) -> String {
            let names: Vec<_> = slots.iter().map(Slot::describe).collect();
            format!("({})", names.join(", "))
        }

        match self {
            FieldKind::Records(layout) => {
                let lines: Vec<_> = layout.lines.iter().map(|l| shape(l.slots)).collect();
                format!("count followed by records of {}", lines.join(" / "))
            }
            FieldKind::Heading { text, .. } => format!("section line {}", text),
            other => {
                let shapes: Vec<_> = other.line_shapes().iter().map(|s| shape(s)).collect();
                shapes.join(" or ")
            }
        }
    }
}

/// Range constraint applied to the numeric values of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constraint {
    /// Any finite number
    Unconstrained,
    /// Every numeric value (flag excluded) within the bounds
    Range(Bounds),
    /// Per-position bounds; `None` and missing positions are unconstrained
    Slots(&'static [Option<Bounds>]),
    /// Records keyed by their first value, which must be unique and within the bounds
    Keyed(Bounds),
}

/// Declaration of one parameter-file entry
#[derive(Debug, Clone, Copy)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub constraint: Constraint,
    pub comment: &'static str,
}

impl FieldDescriptor {
    /// Unconstrained field
    pub const fn new(name: &'static str, kind: FieldKind, comment: &'static str) -> Self {
        Self {
            name,
            kind,
            constraint: Constraint::Unconstrained,
            comment,
        }
    }

    /// Literal section line
    pub const fn heading(name: &'static str, text: &'static str, required: bool) -> Self {
        Self::new(name, FieldKind::Heading { text, required }, "")
    }

    /// Same descriptor with a constraint
    pub const fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Whether this entry carries a value
    pub fn has_value(&self) -> bool {
        !matches!(self.kind, FieldKind::Heading { .. })
    }

    /// Check that `value` has this field's shape and satisfies its constraint
    ///
    /// # Examples
    ///
    /// ```
    /// use drprobe_rs::parameters::{FieldDescriptor, FieldKind, FieldValue};
    ///
    /// const SWITCH: FieldDescriptor =
    ///     FieldDescriptor::new("switch", FieldKind::Flag(&[1, 2, 3]), "Switch");
    ///
    /// assert!(SWITCH.validate(&FieldValue::int(2)).is_ok());
    /// assert!(SWITCH.validate(&FieldValue::int(9)).is_err());
    /// assert!(SWITCH.validate(&FieldValue::real(2.0)).is_err());
    /// ```
    pub fn validate(&self, value: &FieldValue) -> Result<(), ValidationError> {
        self.check_shape(value)?;

        match (&self.kind, value) {
            (FieldKind::Flag(choices), FieldValue::Line(tokens)) => {
                self.check_choice(choices, &tokens[0])
            }
            (FieldKind::FlagGroup { choices, .. }, FieldValue::Line(tokens)) => {
                self.check_choice(choices, &tokens[0])?;
                self.check_tokens(&tokens[1..])
            }
            (_, FieldValue::Line(tokens)) => self.check_tokens(tokens),
            (_, FieldValue::Records(records)) => {
                let mut keys = Vec::with_capacity(records.len());
                for record in records {
                    let flat: Vec<Token> = record.iter().flatten().cloned().collect();
                    self.check_tokens(&flat)?;
                    if let (Constraint::Keyed(_), Some(Token::Int(key))) =
                        (self.constraint, flat.first())
                    {
                        if keys.contains(key) {
                            return Err(ValidationError::DuplicateKey {
                                field: self.name,
                                key: *key,
                            });
                        }
                        keys.push(*key);
                    }
                }
                Ok(())
            }
        }
    }

    /// Check only the shape of `value`
    pub fn check_shape(&self, value: &FieldValue) -> Result<(), ValidationError> {
        fn line_matches(slots: &[Slot], tokens: &[Token]) -> bool {
            slots.len() == tokens.len() && slots.iter().zip(tokens).all(|(s, t)| s.accepts(t))
        }

        let matches = match (&self.kind, value) {
            (FieldKind::Heading { .. }, _) => {
                return Err(ValidationError::NoValue { field: self.name })
            }
            (FieldKind::Records(layout), FieldValue::Records(records)) => {
                records.iter().all(|record| {
                    record.len() == layout.lines.len()
                        && record
                            .iter()
                            .zip(layout.lines)
                            .all(|(tokens, line)| line_matches(line.slots, tokens))
                })
            }
            (FieldKind::Records(_), FieldValue::Line(_)) => false,
            (kind, FieldValue::Line(tokens)) => kind
                .line_shapes()
                .iter()
                .any(|shape| line_matches(shape, tokens)),
            (_, FieldValue::Records(_)) => false,
        };

        if matches {
            Ok(())
        } else {
            Err(ValidationError::Shape {
                field: self.name,
                expected: self.kind.describe(),
            })
        }
    }

    fn check_choice(&self, choices: &'static [i64], token: &Token) -> Result<(), ValidationError> {
        match token {
            Token::Int(value) if choices.contains(value) => Ok(()),
            Token::Int(value) => Err(ValidationError::NotAChoice {
                field: self.name,
                value: *value,
                choices,
            }),
            _ => Err(ValidationError::Shape {
                field: self.name,
                expected: self.kind.describe(),
            }),
        }
    }

    fn check_tokens(&self, tokens: &[Token]) -> Result<(), ValidationError> {
        for (position, token) in tokens.iter().enumerate() {
            match token {
                Token::Text(text) => self.check_text(text)?,
                Token::Int(value) => self.check_number(position, *value as f64)?,
                Token::Real(value) => self.check_number(position, *value)?,
            }
        }
        Ok(())
    }

    fn check_number(&self, position: usize, value: f64) -> Result<(), ValidationError> {
        let bounds = match self.constraint {
            Constraint::Unconstrained => Bounds::unbounded(),
            Constraint::Range(bounds) => bounds,
            Constraint::Slots(slots) => slots
                .get(position)
                .copied()
                .flatten()
                .unwrap_or_else(Bounds::unbounded),
            Constraint::Keyed(bounds) if position == 0 => bounds,
            Constraint::Keyed(_) => Bounds::unbounded(),
        };

        bounds.check(value).map_err(|source| ValidationError::Bounds {
            field: self.name,
            source,
        })
    }

    fn check_text(&self, text: &str) -> Result<(), ValidationError> {
        let reason = if text.contains(['\n', '\r']) {
            Some("contains a line break")
        } else if text.contains('\'') && text.contains('"') {
            Some("contains both quote characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(ValidationError::Text {
                field: self.name,
                value: text.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

/// Conversion between a single token and a Rust value
pub trait TokenType: Sized {
    fn to_token(&self) -> Token;
    fn from_token(token: &Token) -> Option<Self>;
}

impl TokenType for i64 {
    fn to_token(&self) -> Token {
        Token::Int(*self)
    }

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl TokenType for usize {
    fn to_token(&self) -> Token {
        Token::Int(*self as i64)
    }

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Int(value) => usize::try_from(*value).ok(),
            _ => None,
        }
    }
}

impl TokenType for f64 {
    fn to_token(&self) -> Token {
        Token::Real(*self)
    }

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Real(value) => Some(*value),
            _ => None,
        }
    }
}

impl TokenType for String {
    fn to_token(&self) -> Token {
        Token::Text(self.clone())
    }

    fn from_token(token: &Token) -> Option<Self> {
        match token {
            Token::Text(value) => Some(value.clone()),
            _ => None,
        }
    }
}

/// Conversion between a typed model field and a [`FieldValue`]
pub trait FieldType: Sized {
    fn to_field(&self) -> FieldValue;
    fn from_field(value: &FieldValue) -> Option<Self>;
}

macro_rules! scalar_field {
    ($($ty:ty),*) => {
        $(
            impl FieldType for $ty {
                fn to_field(&self) -> FieldValue {
                    FieldValue::Line(vec![self.to_token()])
                }

                fn from_field(value: &FieldValue) -> Option<Self> {
                    match value.tokens()? {
                        [token] => Self::from_token(token),
                        _ => None,
                    }
                }
            }
        )*
    };
}

scalar_field!(i64, usize, f64, String);

impl<A: TokenType, B: TokenType> FieldType for (A, B) {
    fn to_field(&self) -> FieldValue {
        FieldValue::Line(vec![self.0.to_token(), self.1.to_token()])
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value.tokens()? {
            [a, b] => Some((A::from_token(a)?, B::from_token(b)?)),
            _ => None,
        }
    }
}

impl<A: TokenType, B: TokenType, C: TokenType> FieldType for (A, B, C) {
    fn to_field(&self) -> FieldValue {
        FieldValue::Line(vec![self.0.to_token(), self.1.to_token(), self.2.to_token()])
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        match value.tokens()? {
            [a, b, c] => Some((A::from_token(a)?, B::from_token(b)?, C::from_token(c)?)),
            _ => None,
        }
    }
}

/// Flag+parameter group: `flag` selects whether `params` are in effect.
///
/// The parameters are kept and written even while the flag is off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Switched<T> {
    pub flag: i64,
    pub params: T,
}

impl<T> Switched<T> {
    pub fn new(flag: i64, params: T) -> Self {
        Self { flag, params }
    }

    /// `true` for any non-zero flag
    pub fn is_on(&self) -> bool {
        self.flag != 0
    }
}

impl<T: FieldType> FieldType for Switched<T> {
    fn to_field(&self) -> FieldValue {
        let mut tokens = vec![Token::Int(self.flag)];
        if let FieldValue::Line(params) = self.params.to_field() {
            tokens.extend(params);
        }
        FieldValue::Line(tokens)
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        let (flag, params) = value.tokens()?.split_first()?;
        Some(Self {
            flag: i64::from_token(flag)?,
            params: T::from_field(&FieldValue::Line(params.to_vec()))?,
        })
    }
}

/// One entry of a repeated-record field
pub trait Record: Sized {
    fn to_lines(&self) -> Vec<Vec<Token>>;
    fn from_lines(lines: &[Vec<Token>]) -> Option<Self>;
}

impl Record for usize {
    fn to_lines(&self) -> Vec<Vec<Token>> {
        vec![vec![self.to_token()]]
    }

    fn from_lines(lines: &[Vec<Token>]) -> Option<Self> {
        match lines {
            [line] => match line.as_slice() {
                [token] => usize::from_token(token),
                _ => None,
            },
            _ => None,
        }
    }
}

impl<R: Record> FieldType for Vec<R> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Records(self.iter().map(Record::to_lines).collect())
    }

    fn from_field(value: &FieldValue) -> Option<Self> {
        value
            .records()?
            .iter()
            .map(|record| R::from_lines(record))
            .collect()
    }
}
