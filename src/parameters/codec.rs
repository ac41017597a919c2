//! Line codec
//!
//! Reads and writes the values of one field in the fixed-format layout used by
//! the Dr. Probe programs: comma and/or blank separated values, strings in
//! quotes, and everything after a `!` treated as a comment.
//!
//! ```text
//! 40, 40 ! Image output size (<ix> = horizontal , <iy> = vertical) in number of pixels.
//! ```

use crate::parameters::field::{
    FieldDescriptor, FieldKind, FieldValue, Slot, Token, ValidationError,
};
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_till1, take_while},
    character::complete::char,
    sequence::delimited,
    IResult, Parser,
};
use std::iter::{Enumerate, Peekable};
use std::str::Lines;
use thiserror::Error;

/// A line whose shape or values do not match its field descriptor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralError {
    #[error("expected {expected} value(s), found {found}")]
    TokenCount { expected: String, found: usize },

    #[error("'{token}' is not a valid {expected}")]
    InvalidToken { token: String, expected: &'static str },

    #[error("unterminated quoted string")]
    UnterminatedQuote,

    #[error("unexpected end of file")]
    UnexpectedEof,

    #[error("expected section line {expected}, found '{found}'")]
    UnexpectedHeading { expected: &'static str, found: String },

    #[error("record count {0} is negative")]
    NegativeCount(i64),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// A structural error located at a 1-based line number
#[derive(Debug, Clone, PartialEq)]
pub struct LineError {
    pub line: usize,
    pub error: StructuralError,
}

/// One output line: the value columns and the optional trailing comment
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedLine {
    pub values: String,
    pub comment: Option<String>,
}

/// Sequential reader over the lines of a parameter file
pub struct LineCursor<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    total: usize,
    consumed: usize,
}

impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate().peekable(),
            total: text.lines().count(),
            consumed: 0,
        }
    }

    /// 1-based number of the next line to be read
    pub fn next_line_number(&self) -> usize {
        self.consumed + 1
    }

    fn lines_left(&self) -> usize {
        self.total - self.consumed
    }

    fn peek(&mut self) -> Option<&'a str> {
        self.lines.peek().map(|(_, line)| *line)
    }

    fn next_line(&mut self) -> Result<(usize, &'a str), LineError> {
        match self.lines.next() {
            Some((index, line)) => {
                self.consumed = index + 1;
                Ok((index + 1, line))
            }
            None => Err(LineError {
                line: self.next_line_number(),
                error: StructuralError::UnexpectedEof,
            }),
        }
    }

    /// Number of lines not consumed yet
    pub fn remaining(self) -> usize {
        self.lines.count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RawToken<'a> {
    text: &'a str,
    quoted: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct SplitLine<'a> {
    tokens: Vec<RawToken<'a>>,
    comment: Option<&'a str>,
}

type ParseResult<'a, T> = IResult<&'a str, T, nom::error::Error<&'a str>>;

fn separator(input: &str) -> ParseResult<'_, &str> {
    take_while(|c: char| c == ',' || c.is_whitespace()).parse(input)
}

fn quoted(input: &str) -> ParseResult<'_, RawToken<'_>> {
    let (rest, text) = alt((
        delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
    ))
    .parse(input)?;
    Ok((rest, RawToken { text, quoted: true }))
}

fn bare(input: &str) -> ParseResult<'_, RawToken<'_>> {
    let (rest, text) =
        take_till1(|c: char| c == ',' || c == '!' || c.is_whitespace()).parse(input)?;
    Ok((rest, RawToken { text, quoted: false }))
}

/// Split a line into raw value tokens and the comment after `!`
fn split_line(line: &str) -> Result<SplitLine<'_>, StructuralError> {
    let mut tokens = Vec::new();
    let mut input = line;

    loop {
        let (rest, _) = separator(input).map_err(|_| StructuralError::UnterminatedQuote)?;

        if rest.is_empty() {
            return Ok(SplitLine {
                tokens,
                comment: None,
            });
        }

        if let Some(comment) = rest.strip_prefix('!') {
            return Ok(SplitLine {
                tokens,
                comment: Some(comment.trim()),
            });
        }

        let parsed = if rest.starts_with(['\'', '"']) {
            quoted(rest)
        } else {
            bare(rest)
        };

        let (rest, token) = parsed.map_err(|_| StructuralError::UnterminatedQuote)?;
        tokens.push(token);
        input = rest;
    }
}

/// Parse a real number, accepting Fortran `d` exponents (`1.5d-3`)
pub fn parse_real(text: &str) -> Option<f64> {
    let normalized = text.replace(['d', 'D'], "e");
    normalized.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Format a real number so that it always reads back as a real
///
/// # Examples
///
/// ```
/// use drprobe_rs::parameters::codec::format_real;
///
/// assert_eq!(format_real(80.0), "80.0");
/// assert_eq!(format_real(0.00417571), "0.00417571");
/// assert_eq!(format_real(-15000.5), "-15000.5");
/// ```
pub fn format_real(value: f64) -> String {
    let text = value.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

fn quote(text: &str) -> String {
    if text.contains('\'') {
        format!("\"{}\"", text)
    } else {
        format!("'{}'", text)
    }
}

fn render_token(token: &Token) -> String {
    match token {
        Token::Int(value) => value.to_string(),
        Token::Real(value) => format_real(*value),
        Token::Text(text) => quote(text),
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(render_token)
        .collect::<Vec<_>>()
        .join(", ")
}

fn coerce(slot: Slot, raw: RawToken<'_>) -> Result<Token, StructuralError> {
    let invalid = || StructuralError::InvalidToken {
        token: raw.text.to_string(),
        expected: slot.describe(),
    };

    match slot {
        Slot::Text => Ok(Token::Text(raw.text.to_string())),
        _ if raw.quoted => Err(invalid()),
        Slot::Int => raw.text.parse::<i64>().map(Token::Int).map_err(|_| invalid()),
        Slot::Real => parse_real(raw.text).map(Token::Real).ok_or_else(invalid),
    }
}

/// Parse one line against a list of accepted shapes
fn parse_line(shapes: &[Vec<Slot>], line: &str) -> Result<Vec<Token>, StructuralError> {
    let split = split_line(line)?;

    let shape = shapes
        .iter()
        .find(|shape| shape.len() == split.tokens.len())
        .ok_or_else(|| StructuralError::TokenCount {
            expected: shapes
                .iter()
                .map(|shape| shape.len().to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            found: split.tokens.len(),
        })?;

    shape
        .iter()
        .zip(split.tokens)
        .map(|(slot, raw)| coerce(*slot, raw))
        .collect()
}

fn normalize_heading(text: &str) -> &str {
    text.trim().trim_matches(['\'', '"']).trim()
}

/// Read the value of one field, consuming its line(s) from `cursor`
///
/// Returns `Ok(None)` for section lines, which carry no value.
pub fn parse(
    descriptor: &FieldDescriptor,
    cursor: &mut LineCursor<'_>,
) -> Result<Option<FieldValue>, LineError> {
    match &descriptor.kind {
        FieldKind::Heading { text, required } => {
            let matches = cursor
                .peek()
                .map(|line| normalize_heading(line).eq_ignore_ascii_case(normalize_heading(text)));

            match matches {
                Some(true) => {
                    cursor.next_line()?;
                }
                Some(false) | None if *required => {
                    let (line, found) = cursor.next_line()?;
                    return Err(LineError {
                        line,
                        error: StructuralError::UnexpectedHeading {
                            expected: text,
                            found: found.trim().to_string(),
                        },
                    });
                }
                _ => {}
            }
            Ok(None)
        }
        FieldKind::Records(layout) => {
            let (line, text) = cursor.next_line()?;
            let at = |error| LineError { line, error };

            let count = match parse_line(&[vec![Slot::Int]], text).map_err(at)?.as_slice() {
                [Token::Int(count)] if *count >= 0 => *count as usize,
                [Token::Int(count)] => return Err(at(StructuralError::NegativeCount(*count))),
                _ => return Err(at(StructuralError::UnexpectedEof)),
            };

            // Capacity is capped by the lines actually left, not the count read from the file
            let fits = cursor.lines_left() / layout.lines.len().max(1);
            let mut records = Vec::with_capacity(count.min(fits));
            for _ in 0..count {
                let mut record = Vec::with_capacity(layout.lines.len());
                for record_line in layout.lines {
                    let (line, text) = cursor.next_line()?;
                    let tokens = parse_line(&[record_line.slots.to_vec()], text)
                        .map_err(|error| LineError { line, error })?;
                    record.push(tokens);
                }
                records.push(record);
            }

            Ok(Some(FieldValue::Records(records)))
        }
        kind => {
            let (line, text) = cursor.next_line()?;
            let tokens =
                parse_line(&kind.line_shapes(), text).map_err(|error| LineError { line, error })?;
            Ok(Some(FieldValue::Line(tokens)))
        }
    }
}

/// Render the line(s) of one field
///
/// Section lines ignore `value`; every other field requires one of the
/// descriptor's shape. Repeated records are written as their current count
/// followed by exactly that many records.
pub fn render(
    descriptor: &FieldDescriptor,
    value: Option<&FieldValue>,
) -> Result<Vec<RenderedLine>, ValidationError> {
    if let FieldKind::Heading { text, .. } = descriptor.kind {
        return Ok(vec![RenderedLine {
            values: text.to_string(),
            comment: None,
        }]);
    }

    let value = value.ok_or(ValidationError::NoValue {
        field: descriptor.name,
    })?;
    descriptor.check_shape(value)?;

    let comment = Some(descriptor.comment.to_string());

    match (&descriptor.kind, value) {
        (FieldKind::Records(layout), FieldValue::Records(records)) => {
            let mut lines = Vec::with_capacity(1 + records.len() * layout.lines.len());
            lines.push(RenderedLine {
                values: records.len().to_string(),
                comment,
            });

            for record in records {
                for (index, (tokens, record_line)) in record.iter().zip(layout.lines).enumerate() {
                    let comment = match layout.label {
                        Some(label) if index == 0 => label(tokens),
                        _ => record_line.comment.to_string(),
                    };
                    lines.push(RenderedLine {
                        values: render_tokens(tokens),
                        comment: Some(comment),
                    });
                }
            }
            Ok(lines)
        }
        (_, FieldValue::Line(tokens)) => Ok(vec![RenderedLine {
            values: render_tokens(tokens),
            comment,
        }]),
        _ => Err(ValidationError::Shape {
            field: descriptor.name,
            expected: descriptor.kind.describe(),
        }),
    }
}

/// Join rendered lines into file text, aligning every comment to one column
pub fn align(lines: &[RenderedLine]) -> String {
    let width = lines
        .iter()
        .filter(|line| line.comment.is_some())
        .map(|line| line.values.chars().count())
        .max()
        .unwrap_or(0);

    let mut text = String::new();
    for line in lines {
        match &line.comment {
            Some(comment) => {
                text.push_str(&format!("{:<width$} ! {}", line.values, comment, width = width))
            }
            None => text.push_str(&line.values),
        }
        text.push('\n');
    }
    text
}
