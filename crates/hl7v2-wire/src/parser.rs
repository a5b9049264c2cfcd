//! ER7 text to Message
//!
//! Lines are split on the segment terminator, the first header segment
//! supplies the delimiters, then each segment is split top-down.

use hl7v2_core::{
    is_header_segment, EncodingCharacters, Field, Message, ParseError, ParseErrorKind, Segment,
    MSH_CONTINUATION_POINTER, MSH_VERSION,
};

use crate::split::{parse_repetitions, split_level, SplitError};

/// Segment terminator
pub const SEGMENT_TERMINATOR: char = '\r';

/// Parser configuration
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Accept messages that do not start with MSH, skip unparsable lines,
    /// and keep malformed escape sequences as literal text
    pub tolerant: bool,
    /// Version used when MSH-12 is empty
    pub version_hint: Option<String>,
}

impl ParseOptions {
    /// Lenient preset for messy inbound feeds
    pub fn tolerant() -> Self {
        ParseOptions {
            tolerant: true,
            version_hint: None,
        }
    }

    pub fn with_version_hint(mut self, version: impl Into<String>) -> Self {
        self.version_hint = Some(version.into());
        self
    }
}

/// ER7 parser
#[derive(Clone, Debug, Default)]
pub struct Er7Parser {
    options: ParseOptions,
}

/// Parse with default (strict) options
pub fn parse_message(text: &str) -> Result<Message, ParseError> {
    Er7Parser::default().parse(text)
}

/// A physical line and its 1-based number
type Line<'a> = (usize, &'a str);

impl Er7Parser {
    pub fn new(options: ParseOptions) -> Self {
        Er7Parser { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse one message
    pub fn parse(&self, text: &str) -> Result<Message, ParseError> {
        let normalized = text.replace("\r\n", "\r").replace('\n', "\r");
        let mut lines: Vec<Line<'_>> = normalized
            .split(SEGMENT_TERMINATOR)
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();

        if lines.is_empty() {
            return Err(ParseErrorKind::Empty.into());
        }

        if !starts_with_header(lines[0].1) {
            if !self.options.tolerant {
                let name: String = lines[0].1.chars().take(3).collect();
                return Err(ParseError::new(ParseErrorKind::MissingHeader(name)).at_line(lines[0].0));
            }
            let msh = lines
                .iter()
                .position(|(_, line)| line.starts_with("MSH"))
                .ok_or_else(|| ParseError::new(ParseErrorKind::MissingMsh))?;
            tracing::warn!("MSH found at line {}, moving it to the front", lines[msh].0);
            let header = lines.remove(msh);
            lines.insert(0, header);
        }

        let (first_no, first_line) = lines[0];
        let header = parse_header(first_line, self.options.tolerant)
            .map_err(|e| e.at_line(first_no))?;
        let encoding = header_encoding(&header);

        let mut message = Message::new(encoding);
        message.push_segment(header);

        for &(line_no, line) in &lines[1..] {
            match self.parse_line(line, &encoding, &mut message) {
                Ok(()) => {}
                Err(e) if self.options.tolerant => {
                    tracing::warn!("Skipping line {}: {}", line_no, e);
                }
                Err(e) => return Err(e.at_line(line_no)),
            }
        }

        if message.header().is_none() {
            return Err(ParseErrorKind::MissingMsh.into());
        }

        message.version = message
            .header()
            .and_then(|msh| msh.field_value(MSH_VERSION))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .or_else(|| self.options.version_hint.clone());

        tracing::debug!(
            "Parsed {} segments, version {:?}",
            message.segments.len(),
            message.version
        );
        Ok(message)
    }

    fn parse_line(
        &self,
        line: &str,
        encoding: &EncodingCharacters,
        message: &mut Message,
    ) -> Result<(), ParseError> {
        if let Some(cont) = encoding.continuation {
            if let Some(rest) = line.strip_prefix(cont) {
                let rest = rest.strip_prefix(encoding.field).unwrap_or(rest);
                let last = message
                    .segments
                    .last_mut()
                    .ok_or_else(|| ParseError::new(ParseErrorKind::OrphanContinuation))?;
                let offset = last.field_count();
                let fields = parse_fields(rest, encoding, self.options.tolerant)
                    .map_err(|e| located(e, &last.name, offset))?;
                last.fields.extend(fields);
                let count = last.fields.len();
                last.set_original_field_count(count);
                return Ok(());
            }
        }

        if starts_with_header(line) {
            let segment = parse_header(line, self.options.tolerant)?;
            message.push_segment(segment);
            return Ok(());
        }

        let name = segment_name(line, encoding.field)?;
        let rest = line.get(name.len() + encoding.field.len_utf8()..).unwrap_or("");
        let fields = if line.len() > name.len() {
            parse_fields(rest, encoding, self.options.tolerant)
                .map_err(|e| located(e, name, 0))?
        } else {
            Vec::new()
        };
        message.push_segment(Segment::with_fields(name, fields));
        Ok(())
    }
}

fn starts_with_header(line: &str) -> bool {
    line.get(..3).map_or(false, is_header_segment)
}

/// Validate the name at the start of a non-header line
fn segment_name(line: &str, field_sep: char) -> Result<&str, ParseError> {
    let invalid = || {
        let name: String = line.chars().take_while(|c| *c != field_sep).collect();
        ParseError::new(ParseErrorKind::InvalidSegmentName(name))
    };
    let name = line.get(..3).ok_or_else(invalid)?;
    let mut chars = name.chars();
    let well_formed = chars.next().map_or(false, |c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
    if !well_formed {
        return Err(invalid());
    }
    match line[3..].chars().next() {
        None => Ok(name),
        Some(c) if c == field_sep => Ok(name),
        Some(_) => Err(invalid()),
    }
}

/// Parse MSH/BHS/FHS. The field separator follows the name and MSH-2 is
/// taken verbatim.
fn parse_header(line: &str, tolerant: bool) -> Result<Segment, ParseError> {
    let name = &line[..3];
    let mut chars = line[3..].chars();
    let Some(field_sep) = chars.next() else {
        return Err(ParseError::new(ParseErrorKind::HeaderTooShort(line.to_string())).in_segment(name));
    };
    let after_sep = chars.as_str();
    let (msh2, rest) = match after_sep.find(field_sep) {
        Some(i) => (&after_sep[..i], Some(&after_sep[i + field_sep.len_utf8()..])),
        None => (after_sep, None),
    };

    let encoding = EncodingCharacters::from_msh2(field_sep, msh2);
    let mut fields = vec![
        vec![Field::from_value(field_sep.to_string())],
        vec![Field::from_value(msh2)],
    ];
    if let Some(rest) = rest {
        let remaining = parse_fields(rest, &encoding, tolerant).map_err(|e| located(e, name, 2))?;
        fields.extend(remaining);
    }
    Ok(Segment::with_fields(name, fields))
}

/// Delimiters declared by a parsed header segment
fn header_encoding(header: &Segment) -> EncodingCharacters {
    let field_sep = header
        .field_value(1)
        .and_then(|v| v.chars().next())
        .unwrap_or(hl7v2_core::DEFAULT_FIELD_SEPARATOR);
    let msh2 = header.field_value(2).unwrap_or("");
    let continuation = header.field_value(MSH_CONTINUATION_POINTER).and_then(|v| {
        let mut chars = v.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    });
    EncodingCharacters::from_msh2(field_sep, msh2).with_continuation(continuation)
}

/// Field error carrying its 0-based index within the parsed slice
struct FieldError {
    kind: ParseErrorKind,
    index: usize,
}

fn parse_fields(
    text: &str,
    encoding: &EncodingCharacters,
    tolerant: bool,
) -> Result<Vec<Vec<Field>>, FieldError> {
    let parts = split_level(text, encoding.field, encoding.escape, tolerant).map_err(
        |SplitError { kind, part }| FieldError { kind, index: part },
    )?;
    parts
        .into_iter()
        .enumerate()
        .map(|(index, part)| {
            parse_repetitions(part, encoding, tolerant).map_err(|kind| FieldError { kind, index })
        })
        .collect()
}

/// Attach segment and HL7 field number; `offset` is the number of fields
/// preceding the parsed slice
fn located(err: FieldError, segment: &str, offset: usize) -> ParseError {
    ParseError::new(err.kind)
        .in_segment(segment)
        .at_field(offset + err.index + 1)
}
