//! In-memory HL7 v2 message model
//!
//! Message > Segment > field repetitions > Field > Component > Subcomponent.
//! All positional accessors are 1-based, matching HL7 notation, and return
//! `None` instead of panicking when the position does not exist.

use crate::encoding::EncodingCharacters;

/// Segment names whose first two fields hold the delimiters
pub const HEADER_SEGMENTS: [&str; 3] = ["MSH", "BHS", "FHS"];

/// MSH-10
pub const MSH_CONTROL_ID: usize = 10;
/// MSH-12
pub const MSH_VERSION: usize = 12;
/// MSH-13
pub const MSH_SEQUENCE_NUMBER: usize = 13;
/// MSH-14
pub const MSH_CONTINUATION_POINTER: usize = 14;

/// Is `name` one of MSH, BHS, FHS
#[inline]
pub fn is_header_segment(name: &str) -> bool {
    HEADER_SEGMENTS.contains(&name)
}

/// Leaf text value, stored unescaped
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Subcomponent {
    pub value: String,
}

impl Subcomponent {
    pub fn new(value: impl Into<String>) -> Self {
        Subcomponent {
            value: value.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Ordered subcomponents
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Component {
    pub subcomponents: Vec<Subcomponent>,
}

impl Component {
    pub fn new(subcomponents: Vec<Subcomponent>) -> Self {
        Component { subcomponents }
    }

    /// Component with a single subcomponent
    pub fn from_value(value: impl Into<String>) -> Self {
        Component {
            subcomponents: vec![Subcomponent::new(value)],
        }
    }

    /// 1-based subcomponent
    pub fn subcomponent(&self, index: usize) -> Option<&Subcomponent> {
        index.checked_sub(1).and_then(|i| self.subcomponents.get(i))
    }

    /// First subcomponent's text, or "" when there is none
    pub fn value(&self) -> &str {
        self.subcomponents
            .first()
            .map(|s| s.value.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.subcomponents.iter().all(Subcomponent::is_empty)
    }
}

/// One field occurrence.
///
/// Absent fields have no `Field` at all. An empty field has no components
/// and `is_null == false`. A null field (`""` on the wire) has no components
/// and `is_null == true`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Field {
    pub components: Vec<Component>,
    pub is_null: bool,
}

impl Field {
    /// Present but blank
    pub fn empty() -> Self {
        Field::default()
    }

    /// Explicit null (`""`)
    pub fn null() -> Self {
        Field {
            components: Vec::new(),
            is_null: true,
        }
    }

    pub fn new(components: Vec<Component>) -> Self {
        Field {
            components,
            is_null: false,
        }
    }

    /// Single-component, single-subcomponent field
    pub fn from_value(value: impl Into<String>) -> Self {
        Field::new(vec![Component::from_value(value)])
    }

    /// One simple component per item
    pub fn from_components<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Field::new(values.into_iter().map(Component::from_value).collect())
    }

    /// 1-based component
    pub fn component(&self, index: usize) -> Option<&Component> {
        index.checked_sub(1).and_then(|i| self.components.get(i))
    }

    /// First component's first subcomponent, or "" for empty/null fields
    pub fn value(&self) -> &str {
        self.components.first().map(Component::value).unwrap_or("")
    }

    /// Present, not null, and carrying no text
    pub fn is_empty(&self) -> bool {
        !self.is_null && self.components.iter().all(Component::is_empty)
    }
}

/// A named segment holding field-repetition groups.
///
/// For MSH/BHS/FHS, field 1 is the field separator and field 2 the raw
/// encoding characters, so `field(n)` is always HL7's `XXX-n`.
#[derive(Clone, Debug, Default)]
pub struct Segment {
    pub name: String,
    /// One group per field position; each group holds its repetitions
    pub fields: Vec<Vec<Field>>,
    original_field_count: usize,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Segment {
            name: name.into(),
            fields: Vec::new(),
            original_field_count: 0,
        }
    }

    /// Header segment (MSH/BHS/FHS) with its two delimiter fields filled in
    pub fn header(name: impl Into<String>, encoding: &EncodingCharacters) -> Self {
        let mut segment = Segment::new(name);
        segment.push_field(Field::from_value(encoding.field.to_string()));
        segment.push_field(Field::from_value(encoding.msh2()));
        segment
    }

    /// Segment built from field groups, remembering their count
    pub fn with_fields(name: impl Into<String>, fields: Vec<Vec<Field>>) -> Self {
        let original_field_count = fields.len();
        Segment {
            name: name.into(),
            fields,
            original_field_count,
        }
    }

    pub fn is_header(&self) -> bool {
        is_header_segment(&self.name)
    }

    /// Number of field positions held
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Field count seen when the segment was parsed
    pub fn original_field_count(&self) -> usize {
        self.original_field_count
    }

    pub fn set_original_field_count(&mut self, count: usize) {
        self.original_field_count = count;
    }

    /// First repetition of field `index`
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.repetitions(index).and_then(|reps| reps.first())
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut Field> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.get_mut(i))
            .and_then(|reps| reps.first_mut())
    }

    /// All repetitions of field `index`
    pub fn repetitions(&self, index: usize) -> Option<&[Field]> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.get(i))
            .map(Vec::as_slice)
    }

    /// Text of the first component/subcomponent of field `index`
    pub fn field_value(&self, index: usize) -> Option<&str> {
        self.field(index).map(Field::value)
    }

    /// Append a field position with one repetition
    pub fn push_field(&mut self, field: Field) {
        self.fields.push(vec![field]);
    }

    /// Replace field `index`, padding missing positions with empty fields.
    /// Index 0 is ignored.
    pub fn set_field(&mut self, index: usize, field: Field) {
        self.set_repetitions(index, vec![field]);
    }

    /// Replace all repetitions of field `index`, padding as in `set_field`
    pub fn set_repetitions(&mut self, index: usize, repetitions: Vec<Field>) {
        if index == 0 {
            return;
        }
        while self.fields.len() < index {
            self.fields.push(vec![Field::empty()]);
        }
        self.fields[index - 1] = repetitions;
    }
}

// Equality is structural and ignores the recorded parse-time field count.
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.fields == other.fields
    }
}

impl Eq for Segment {}

/// A complete HL7 v2 message
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Message {
    pub segments: Vec<Segment>,
    pub encoding: EncodingCharacters,
    pub version: Option<String>,
}

impl Message {
    pub fn new(encoding: EncodingCharacters) -> Self {
        Message {
            segments: Vec::new(),
            encoding,
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn push_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// First MSH segment
    pub fn header(&self) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == "MSH")
    }

    pub fn header_mut(&mut self) -> Option<&mut Segment> {
        self.segments.iter_mut().find(|s| s.name == "MSH")
    }

    /// First segment named `name`
    pub fn segment(&self, name: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.name == name)
    }

    pub fn segments_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Segment> + 'a {
        self.segments.iter().filter(move |s| s.name == name)
    }

    /// MSH-10, when present and non-empty
    pub fn control_id(&self) -> Option<&str> {
        self.header_value(MSH_CONTROL_ID)
    }

    /// Raw MSH-13, when present and non-empty
    pub fn sequence_number(&self) -> Option<&str> {
        self.header_value(MSH_SEQUENCE_NUMBER)
    }

    /// MSH-9 message code and trigger event
    pub fn message_type(&self) -> Option<(&str, &str)> {
        let field = self.header()?.field(9)?;
        let code = field.component(1).map(Component::value).unwrap_or("");
        let trigger = field.component(2).map(Component::value).unwrap_or("");
        if code.is_empty() && trigger.is_empty() {
            return None;
        }
        Some((code, trigger))
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn header_value(&self, index: usize) -> Option<&str> {
        self.header()
            .and_then(|msh| msh.field_value(index))
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_msh() -> Segment {
        let enc = EncodingCharacters::default();
        let mut msh = Segment::header("MSH", &enc);
        msh.set_field(9, Field::from_components(["ADT", "A01"]));
        msh.set_field(10, Field::from_value("MSG00001"));
        msh.set_field(12, Field::from_value("2.5"));
        msh
    }

    #[test]
    fn test_field_states() {
        let empty = Field::empty();
        let null = Field::null();
        assert!(empty.is_empty());
        assert!(!empty.is_null);
        assert!(null.is_null);
        assert!(!null.is_empty());
        assert!(null.components.is_empty());
        assert_ne!(empty, null);
    }

    #[test]
    fn test_accessors_are_one_based() {
        let mut pid = Segment::new("PID");
        pid.push_field(Field::from_value("1"));
        pid.push_field(Field::empty());
        pid.push_field(Field::from_components(["12345", "", "", "MRN"]));

        assert_eq!(pid.field_value(1), Some("1"));
        assert_eq!(pid.field(0), None);
        assert_eq!(pid.field(4), None);
        let id = pid.field(3).unwrap();
        assert_eq!(id.component(4).unwrap().value(), "MRN");
        assert!(id.component(5).is_none());
        assert!(id.component(1).unwrap().subcomponent(2).is_none());
    }

    #[test]
    fn test_set_field_pads() {
        let mut seg = Segment::new("OBX");
        seg.set_field(5, Field::from_value("120"));
        assert_eq!(seg.field_count(), 5);
        assert!(seg.field(2).unwrap().is_empty());
        assert_eq!(seg.field_value(5), Some("120"));

        seg.set_field(0, Field::from_value("ignored"));
        assert_eq!(seg.field_count(), 5);
    }

    #[test]
    fn test_header_numbering() {
        let msh = sample_msh();
        assert!(msh.is_header());
        assert_eq!(msh.field_value(1), Some("|"));
        assert_eq!(msh.field_value(2), Some("^~\\&"));
        assert_eq!(msh.field_value(12), Some("2.5"));
    }

    #[test]
    fn test_message_helpers() {
        let mut msg = Message::new(EncodingCharacters::default()).with_version("2.5");
        msg.push_segment(sample_msh());
        msg.push_segment(Segment::new("PID"));
        msg.push_segment(Segment::new("OBX"));
        msg.push_segment(Segment::new("OBX"));

        assert_eq!(msg.control_id(), Some("MSG00001"));
        assert_eq!(msg.sequence_number(), None);
        assert_eq!(msg.message_type(), Some(("ADT", "A01")));
        assert_eq!(msg.segments_named("OBX").count(), 2);
        assert_eq!(msg.version(), Some("2.5"));
    }

    #[test]
    fn test_segment_eq_ignores_original_count() {
        let mut a = Segment::with_fields("PID", vec![vec![Field::from_value("1")]]);
        let b = Segment::with_fields("PID", vec![vec![Field::from_value("1")]]);
        a.set_original_field_count(10);
        assert_eq!(a, b);
    }
}
