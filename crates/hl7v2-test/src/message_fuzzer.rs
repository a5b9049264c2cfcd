//! Message Fuzzer - Seeded round-trip testing for the ER7 codec
//!
//! Tests:
//! - Serialize, parse and serialize again yields identical text
//! - Delimiters and line breaks inside values survive escaping
//! - Line continuation reassembles into the same segment
//! - Null fields stay null

use hl7v2_core::{
    is_header_segment, Component, EncodingCharacters, Field, Message, Segment, Subcomponent,
    DEFAULT_VERSION, MSH_CONTINUATION_POINTER, MSH_CONTROL_ID, MSH_VERSION,
};
use hl7v2_wire::{Er7Parser, Er7Serializer, SerializeOptions};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Continuation character used when the fuzzer enables line splitting
pub const FUZZ_CONTINUATION: char = '+';

const SEGMENT_NAMES: &[&str] = &["PID", "PV1", "OBR", "OBX", "NTE", "NK1", "ZXT", "Z01"];

/// Value alphabet. Includes every default delimiter and both line breaks.
const ALPHABET: &[char] = &[
    'A', 'B', 'H', 'N', 'X', 'Z', 'a', 'z', '0', '1', '9', ' ', '.', '-', '/', '|', '^', '~',
    '\\', '&', '\n', '\r',
];

/// Fuzzer configuration
#[derive(Clone, Debug)]
pub struct FuzzerConfig {
    /// Number of messages to generate
    pub message_count: usize,
    /// Maximum body segments per message
    pub max_segments: usize,
    /// Maximum fields per segment
    pub max_fields: usize,
    /// Maximum components per field
    pub max_components: usize,
    /// Maximum characters per value
    pub max_value_len: usize,
    /// Probability of a repeated field
    pub repetition_prob: f64,
    /// Probability of a null field
    pub null_prob: f64,
    /// Probability that a message is rendered with short continued lines
    pub continuation_prob: f64,
    /// Random seed
    pub seed: u64,
}

impl Default for FuzzerConfig {
    fn default() -> Self {
        FuzzerConfig {
            message_count: 200,
            max_segments: 6,
            max_fields: 12,
            max_components: 4,
            max_value_len: 12,
            repetition_prob: 0.1,
            null_prob: 0.05,
            continuation_prob: 0.2,
            seed: 42,
        }
    }
}

impl FuzzerConfig {
    /// Light fuzzing for quick tests
    pub fn light() -> Self {
        FuzzerConfig {
            message_count: 50,
            max_segments: 3,
            max_fields: 6,
            max_components: 3,
            max_value_len: 8,
            repetition_prob: 0.1,
            null_prob: 0.05,
            continuation_prob: 0.1,
            seed: 42,
        }
    }

    /// Heavy fuzzing for thorough testing
    pub fn heavy() -> Self {
        FuzzerConfig {
            message_count: 2000,
            max_segments: 20,
            max_fields: 40,
            max_components: 6,
            max_value_len: 40,
            repetition_prob: 0.3,
            null_prob: 0.1,
            continuation_prob: 0.4,
            seed: 42,
        }
    }
}

/// A failed round trip
#[derive(Clone, Debug)]
pub struct RoundTripFailure {
    /// Index of the generated message
    pub index: usize,
    /// First rendering
    pub rendered: String,
    /// Parse error, or the differing second rendering
    pub detail: String,
}

/// Fuzzing result
#[derive(Debug, Default)]
pub struct FuzzResult {
    pub messages: usize,
    pub stable: usize,
    /// Messages that were rendered with continuation lines
    pub continued: usize,
    pub failures: Vec<RoundTripFailure>,
}

impl FuzzResult {
    pub fn new() -> Self {
        FuzzResult::default()
    }

    pub fn is_valid(&self) -> bool {
        self.failures.is_empty() && self.stable == self.messages
    }
}

/// Codec fuzzer
pub struct MessageFuzzer {
    config: FuzzerConfig,
    rng: StdRng,
    parser: Er7Parser,
    control_seq: u64,
}

impl MessageFuzzer {
    pub fn new(config: FuzzerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        MessageFuzzer {
            config,
            rng,
            parser: Er7Parser::default(),
            control_seq: 0,
        }
    }

    /// Generate a random message. The second value is the line length to
    /// render it with.
    pub fn generate_message(&mut self) -> (Message, usize) {
        self.control_seq += 1;
        let continued = self.rng.gen::<f64>() < self.config.continuation_prob;
        let encoding = EncodingCharacters::default()
            .with_continuation(continued.then_some(FUZZ_CONTINUATION));

        let mut msh = Segment::header("MSH", &encoding);
        msh.set_field(3, Field::from_value("FUZZ"));
        msh.set_field(9, Field::from_components(["ADT", "A01"]));
        msh.set_field(MSH_CONTROL_ID, Field::from_value(format!("F{:06}", self.control_seq)));
        msh.set_field(MSH_VERSION, Field::from_value(DEFAULT_VERSION));
        if continued {
            msh.set_field(MSH_CONTINUATION_POINTER, Field::from_value(FUZZ_CONTINUATION.to_string()));
        }

        let mut message = Message::new(encoding).with_version(DEFAULT_VERSION);
        message.push_segment(msh);

        let segment_count = self.rng.gen_range(1..=self.config.max_segments.max(1));
        for _ in 0..segment_count {
            let segment = self.generate_segment();
            message.push_segment(segment);
        }

        let max_line = if continued {
            self.rng.gen_range(20..80)
        } else {
            hl7v2_wire::DEFAULT_MAX_LINE_LENGTH
        };
        (message, max_line)
    }

    fn generate_segment(&mut self) -> Segment {
        let name = SEGMENT_NAMES[self.rng.gen_range(0..SEGMENT_NAMES.len())];
        let mut segment = Segment::new(name);
        let field_count = self.rng.gen_range(0..=self.config.max_fields);
        for index in 1..=field_count {
            if self.rng.gen::<f64>() < self.config.repetition_prob {
                let reps = (0..self.rng.gen_range(2..4))
                    .map(|_| self.generate_field())
                    .collect();
                segment.set_repetitions(index, reps);
            } else {
                let field = self.generate_field();
                segment.set_field(index, field);
            }
        }
        segment
    }

    fn generate_field(&mut self) -> Field {
        if self.rng.gen::<f64>() < self.config.null_prob {
            return Field::null();
        }
        let count = self.rng.gen_range(1..=self.config.max_components.max(1));
        let components = (0..count)
            .map(|_| {
                let subs = if self.rng.gen::<f64>() < 0.1 { 2 } else { 1 };
                Component::new((0..subs).map(|_| Subcomponent::new(self.generate_value())).collect())
            })
            .collect();
        Field::new(components)
    }

    fn generate_value(&mut self) -> String {
        let len = self.rng.gen_range(0..=self.config.max_value_len);
        (0..len)
            .map(|_| ALPHABET[self.rng.gen_range(0..ALPHABET.len())])
            .collect()
    }

    /// Generate and round-trip every message
    pub fn run(&mut self) -> FuzzResult {
        let mut result = FuzzResult::new();
        for index in 0..self.config.message_count {
            let (message, max_line) = self.generate_message();
            result.messages += 1;
            if message.encoding.continuation.is_some() {
                result.continued += 1;
            }
            match self.round_trip(&message, max_line) {
                Ok(()) => result.stable += 1,
                Err(failure) => {
                    tracing::warn!("Round trip {} failed: {}", index, failure.detail);
                    result.failures.push(RoundTripFailure { index, ..failure });
                }
            }
        }
        result
    }

    fn round_trip(&self, message: &Message, max_line: usize) -> Result<(), RoundTripFailure> {
        let serializer = Er7Serializer::new(SerializeOptions {
            max_line_length: max_line,
            ..SerializeOptions::default()
        });
        let failure = |rendered: &str, detail: String| RoundTripFailure {
            index: 0,
            rendered: rendered.to_string(),
            detail,
        };

        let first = serializer
            .serialize(message)
            .map_err(|e| failure("", e.to_string()))?;
        let parsed = self
            .parser
            .parse(&first)
            .map_err(|e| failure(&first, e.to_string()))?;
        let second = serializer
            .serialize(&parsed)
            .map_err(|e| failure(&first, e.to_string()))?;
        if first != second {
            return Err(failure(&first, second));
        }
        Ok(())
    }
}

/// Property-based test helpers
pub mod properties {
    use super::*;

    /// Property: null fields in `original` are null at the same position in `parsed`
    pub fn nulls_preserved(original: &Message, parsed: &Message) -> bool {
        original
            .segments
            .iter()
            .zip(&parsed.segments)
            .all(|(a, b)| {
                a.fields.iter().enumerate().all(|(i, reps)| {
                    !reps.iter().any(|f| f.is_null)
                        || b.fields
                            .get(i)
                            .map_or(false, |other| other.iter().any(|f| f.is_null))
                })
            })
    }

    /// Property: a physical line longer than `max` had no field separator
    /// to cut at within its first `max` bytes. Header lines are exempt up
    /// to MSH-14.
    pub fn lines_bounded(text: &str, max: usize, field_sep: char) -> bool {
        text.split('\r').filter(|l| !l.is_empty()).all(|line| {
            line.len() <= max
                || line.get(..3).map_or(false, is_header_segment)
                || !line
                    .char_indices()
                    .any(|(i, c)| c == field_sep && (4..=max).contains(&i))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7v2_wire::serialize_message;
    use proptest::prelude::*;

    #[test]
    fn test_fuzzer_light() {
        let mut fuzzer = MessageFuzzer::new(FuzzerConfig::light());
        let result = fuzzer.run();
        assert_eq!(result.messages, 50);
        assert!(result.is_valid(), "failures: {:?}", result.failures);
    }

    #[test]
    fn test_fuzzer_default() {
        let mut fuzzer = MessageFuzzer::new(FuzzerConfig::default());
        let result = fuzzer.run();
        assert!(result.continued > 0);
        assert!(result.is_valid(), "failures: {:?}", result.failures);
    }

    #[test]
    fn test_seed_is_deterministic() {
        let mut a = MessageFuzzer::new(FuzzerConfig::light());
        let mut b = MessageFuzzer::new(FuzzerConfig::light());
        for _ in 0..10 {
            assert_eq!(a.generate_message(), b.generate_message());
        }
    }

    #[test]
    fn test_nulls_survive() {
        let config = FuzzerConfig {
            null_prob: 0.5,
            continuation_prob: 0.0,
            ..FuzzerConfig::light()
        };
        let mut fuzzer = MessageFuzzer::new(config);
        let parser = Er7Parser::default();
        for _ in 0..20 {
            let (message, max_line) = fuzzer.generate_message();
            let text = serialize_message(&message, max_line, true).unwrap();
            let parsed = parser.parse(&text).unwrap();
            assert!(properties::nulls_preserved(&message, &parsed), "{}", text);
        }
    }

    #[test]
    fn test_continued_lines_bounded() {
        let config = FuzzerConfig {
            continuation_prob: 1.0,
            ..FuzzerConfig::default()
        };
        let mut fuzzer = MessageFuzzer::new(config);
        for _ in 0..20 {
            let (message, max_line) = fuzzer.generate_message();
            assert_eq!(message.encoding.continuation, Some(FUZZ_CONTINUATION));
            let text = serialize_message(&message, max_line, true).unwrap();
            assert!(properties::lines_bounded(&text, max_line, '|'));
        }
    }

    #[test]
    fn test_long_header_with_continuation() {
        let config = FuzzerConfig {
            continuation_prob: 1.0,
            ..FuzzerConfig::light()
        };
        let mut fuzzer = MessageFuzzer::new(config);
        let parser = Er7Parser::default();
        for _ in 0..20 {
            let (mut message, _) = fuzzer.generate_message();
            if let Some(msh) = message.segments.first_mut() {
                msh.set_field(4, Field::from_value("F".repeat(50)));
                msh.set_field(15, Field::from_value("AL"));
            }
            let text = serialize_message(&message, 24, true).unwrap();
            let parsed = parser.parse(&text).unwrap();
            assert_eq!(parsed.encoding.continuation, Some(FUZZ_CONTINUATION));
            assert_eq!(serialize_message(&parsed, 24, true).unwrap(), text);
        }
    }

    proptest! {
        #[test]
        fn prop_any_seed_round_trips(seed in any::<u64>(), continuation_prob in 0.0f64..=1.0) {
            let config = FuzzerConfig {
                message_count: 5,
                continuation_prob,
                seed,
                ..FuzzerConfig::light()
            };
            let result = MessageFuzzer::new(config).run();
            prop_assert_eq!(result.messages, 5);
            prop_assert!(result.is_valid(), "failures: {:?}", result.failures);
        }
    }
}
