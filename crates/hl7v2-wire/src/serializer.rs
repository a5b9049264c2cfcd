//! Message to ER7 text

use hl7v2_core::{
    Component, EncodingCharacters, Field, Hl7Error, Hl7Result, Message, Segment,
    MSH_CONTINUATION_POINTER,
};

use crate::escape::escape;
use crate::parser::SEGMENT_TERMINATOR;
use crate::split::NULL_VALUE;

/// Default maximum physical line length
pub const DEFAULT_MAX_LINE_LENGTH: usize = 32767;

/// Serializer configuration
#[derive(Clone, Debug)]
pub struct SerializeOptions {
    /// Longest physical line, in bytes, before continuation splitting
    pub max_line_length: usize,
    /// Trim trailing empty fields
    pub normalize: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        SerializeOptions {
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            normalize: true,
        }
    }
}

impl SerializeOptions {
    /// Keep parsed field counts, for byte-faithful round trips
    pub fn raw() -> Self {
        SerializeOptions {
            normalize: false,
            ..Self::default()
        }
    }
}

/// ER7 serializer
#[derive(Clone, Debug, Default)]
pub struct Er7Serializer {
    options: SerializeOptions,
}

/// Serialize with explicit line length and normalization
pub fn serialize_message(
    message: &Message,
    max_line_length: usize,
    normalize: bool,
) -> Hl7Result<String> {
    Er7Serializer::new(SerializeOptions {
        max_line_length,
        normalize,
    })
    .serialize(message)
}

impl Er7Serializer {
    pub fn new(options: SerializeOptions) -> Self {
        Er7Serializer { options }
    }

    pub fn options(&self) -> &SerializeOptions {
        &self.options
    }

    /// Render the whole message, one terminator after every physical line
    pub fn serialize(&self, message: &Message) -> Hl7Result<String> {
        if message.segments.is_empty() {
            return Err(Hl7Error::EmptyMessage);
        }
        let enc = &message.encoding;
        let mut out = String::new();
        for segment in &message.segments {
            let line = serialize_segment(segment, enc, self.options.normalize);
            match enc.continuation {
                Some(cont) if line.len() > self.options.max_line_length => {
                    let floor = split_floor(segment, &line, enc);
                    write_continued(&mut out, &line, floor, cont, enc.field, self.options.max_line_length);
                }
                _ => {
                    out.push_str(&line);
                    out.push(SEGMENT_TERMINATOR);
                }
            }
        }
        Ok(out)
    }
}

/// Render one segment as a single logical line (no terminator)
pub fn serialize_segment(segment: &Segment, enc: &EncodingCharacters, normalize: bool) -> String {
    let header = segment.is_header();
    // Header segments are never trimmed, only given their MSH-1/MSH-2 pair
    let count = if normalize && header {
        segment.field_count().max(2)
    } else if normalize {
        segment
            .fields
            .iter()
            .rposition(|reps| !reps.iter().all(Field::is_empty))
            .map_or(0, |i| i + 1)
    } else {
        segment.field_count().max(segment.original_field_count())
    };

    let mut line = String::with_capacity(64);
    line.push_str(&segment.name);
    let start = if header {
        line.push(enc.field);
        let msh2 = segment.field_value(2).filter(|v| !v.is_empty());
        match msh2 {
            Some(raw) => line.push_str(raw),
            None => line.push_str(&enc.msh2()),
        }
        2
    } else {
        0
    };

    for index in start..count {
        line.push(enc.field);
        if let Some(reps) = segment.fields.get(index) {
            line.push_str(&serialize_repetitions(reps, enc));
        }
    }
    line
}

/// Render one field position with all its repetitions
pub fn serialize_repetitions(reps: &[Field], enc: &EncodingCharacters) -> String {
    let mut out = String::new();
    for (i, field) in reps.iter().enumerate() {
        if i > 0 {
            out.push(enc.repetition);
        }
        out.push_str(&serialize_field(field, enc));
    }
    out
}

/// Render one repetition. Null is `""`.
pub fn serialize_field(field: &Field, enc: &EncodingCharacters) -> String {
    if field.is_null {
        return NULL_VALUE.to_string();
    }
    let mut out = String::new();
    for (i, component) in field.components.iter().enumerate() {
        if i > 0 {
            out.push(enc.component);
        }
        out.push_str(&serialize_component(component, enc));
    }
    out
}

pub fn serialize_component(component: &Component, enc: &EncodingCharacters) -> String {
    let mut out = String::new();
    for (i, sub) in component.subcomponents.iter().enumerate() {
        if i > 0 {
            out.push(enc.subcomponent);
        }
        out.push_str(&escape(&sub.value, enc));
    }
    out
}

/// Smallest byte index a line may be cut at. The segment name always stays
/// on the first line. Header segments keep everything up to and including
/// MSH-14, since the parser only learns the continuation character from
/// the first physical line.
fn split_floor(segment: &Segment, line: &str, enc: &EncodingCharacters) -> usize {
    let after_name = segment.name.len() + enc.field.len_utf8();
    if !segment.is_header() {
        return after_name;
    }
    // The separator at index 0 is MSH-1, so the nth one after it ends MSH-(n+1)
    line.match_indices(enc.field)
        .nth(MSH_CONTINUATION_POINTER - 1)
        .map_or(line.len(), |(i, _)| i)
}

/// Largest index `<= index` on a char boundary
fn char_floor(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Last field separator in `text` at or before `limit`, not below `floor`
fn last_boundary(text: &str, field_sep: char, floor: usize, limit: usize) -> Option<usize> {
    let window = char_floor(text, limit.saturating_add(1));
    text[..window].rfind(field_sep).filter(|&i| i >= floor)
}

fn write_continued(
    out: &mut String,
    line: &str,
    floor: usize,
    cont: char,
    field_sep: char,
    max: usize,
) {
    let Some(cut) = last_boundary(line, field_sep, floor, max) else {
        out.push_str(line);
        out.push(SEGMENT_TERMINATOR);
        return;
    };
    out.push_str(&line[..cut]);
    out.push(SEGMENT_TERMINATOR);

    let prefix_len = cont.len_utf8() + field_sep.len_utf8();
    let mut rest = &line[cut + field_sep.len_utf8()..];
    loop {
        out.push(cont);
        out.push(field_sep);
        if prefix_len + rest.len() <= max || max <= prefix_len {
            out.push_str(rest);
            out.push(SEGMENT_TERMINATOR);
            return;
        }
        match last_boundary(rest, field_sep, 0, max - prefix_len) {
            Some(cut) => {
                out.push_str(&rest[..cut]);
                out.push(SEGMENT_TERMINATOR);
                rest = &rest[cut + field_sep.len_utf8()..];
            }
            None => {
                out.push_str(rest);
                out.push(SEGMENT_TERMINATOR);
                return;
            }
        }
    }
}
