//! Error types for HL7 v2 processing

use std::fmt;

use thiserror::Error;

/// What went wrong while reading ER7 text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("Empty message")]
    Empty,

    #[error("First segment must be MSH, BHS or FHS, found {0:?}")]
    MissingHeader(String),

    #[error("Message contains no MSH segment")]
    MissingMsh,

    #[error("Header segment too short: {0:?}")]
    HeaderTooShort(String),

    #[error("Invalid segment name: {0:?}")]
    InvalidSegmentName(String),

    #[error("Unterminated escape sequence")]
    UnterminatedEscape,

    #[error("Unknown escape sequence: {0:?}")]
    InvalidEscape(String),

    #[error("Continuation line without a preceding segment")]
    OrphanContinuation,
}

impl ParseErrorKind {
    /// Stable code for this kind of failure
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorKind::Empty => "PARSE_001",
            ParseErrorKind::MissingHeader(_) | ParseErrorKind::MissingMsh => "PARSE_002",
            ParseErrorKind::HeaderTooShort(_) | ParseErrorKind::InvalidSegmentName(_) => {
                "PARSE_003"
            }
            ParseErrorKind::UnterminatedEscape | ParseErrorKind::InvalidEscape(_) => "PARSE_004",
            ParseErrorKind::OrphanContinuation => "PARSE_005",
        }
    }
}

/// Structural parse failure with optional location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// 1-based physical line number
    pub line: Option<usize>,
    pub segment: Option<String>,
    /// 1-based field number (HL7 numbering)
    pub field: Option<usize>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind) -> Self {
        ParseError {
            kind,
            line: None,
            segment: None,
            field: None,
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn in_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    pub fn at_field(mut self, field: usize) -> Self {
        self.field = Some(field);
        self
    }
}

impl From<ParseErrorKind> for ParseError {
    fn from(kind: ParseErrorKind) -> Self {
        ParseError::new(kind)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.kind)?;
        if let Some(line) = self.line {
            write!(f, " at line {}", line)?;
        }
        if let Some(segment) = &self.segment {
            write!(f, ", segment {}", segment)?;
        }
        if let Some(field) = self.field {
            write!(f, ", field {}", field)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

/// Fatal version migration failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Source message has no version (MSH-12 is empty)")]
    MissingSourceVersion,

    #[error("Target version {0} is not supported")]
    UnsupportedTargetVersion(String),
}

/// Top-level HL7 errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Hl7Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("Cannot serialize a message with no segments")]
    EmptyMessage,

    #[error("Message has no MSH segment")]
    MissingHeader,
}

impl From<ParseErrorKind> for Hl7Error {
    fn from(kind: ParseErrorKind) -> Self {
        Hl7Error::Parse(ParseError::new(kind))
    }
}

/// Result type for HL7 operations
pub type Hl7Result<T> = Result<T, Hl7Error>;
