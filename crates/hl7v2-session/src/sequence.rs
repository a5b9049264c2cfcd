//! MSH-13 sequence number issuing and checking

use std::collections::BTreeSet;
use std::fmt;

use hl7v2_core::{Message, MSH_SEQUENCE_NUMBER};
use parking_lot::Mutex;
use thiserror::Error;

/// Most numbers `missing_sequences` lists
pub const MAX_LISTED_MISSING: usize = 65_536;

/// Why a sequence number was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Message has no MSH segment")]
    MissingHeader,

    #[error("Invalid sequence number format: {0:?}")]
    InvalidFormat(String),

    #[error("Sequence number mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: i64, actual: i64 },
}

/// Manager configuration
#[derive(Clone, Copy, Debug)]
pub struct SequenceConfig {
    /// First number handed out by `next_sequence`
    pub initial_sequence: i64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        SequenceConfig { initial_sequence: 1 }
    }
}

#[derive(Debug)]
struct SequenceState {
    next: i64,
    received: BTreeSet<i64>,
}

/// Issues outgoing sequence numbers and tracks incoming ones.
///
/// Issuing and recording share one lock.
#[derive(Debug)]
pub struct SequenceNumberManager {
    config: SequenceConfig,
    state: Mutex<SequenceState>,
}

impl SequenceNumberManager {
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    pub fn with_config(config: SequenceConfig) -> Self {
        SequenceNumberManager {
            config,
            state: Mutex::new(SequenceState {
                next: config.initial_sequence,
                received: BTreeSet::new(),
            }),
        }
    }

    /// Next outgoing number. Strictly increasing across all callers.
    pub fn next_sequence(&self) -> i64 {
        let mut state = self.state.lock();
        let seq = state.next;
        state.next += 1;
        seq
    }

    /// Check MSH-13 and record it when valid.
    ///
    /// A message without MSH-13 is valid and records nothing.
    pub fn validate_sequence(
        &self,
        message: &Message,
        expected: Option<i64>,
    ) -> (bool, Option<SequenceError>) {
        match read_sequence(message, expected) {
            Ok(Some(seq)) => {
                self.state.lock().received.insert(seq);
                (true, None)
            }
            Ok(None) => (true, None),
            Err(e) => {
                tracing::debug!("Sequence check failed: {}", e);
                (false, Some(e))
            }
        }
    }

    /// Compare MSH-13 with `last_sequence`, or with the highest number seen
    /// so far. Returns the number of skipped values when there is a gap.
    pub fn check_gap(&self, message: &Message, last_sequence: Option<i64>) -> (bool, Option<i64>) {
        let Ok(Some(seq)) = read_sequence(message, None) else {
            return (false, None);
        };
        let last = match last_sequence {
            Some(last) => last,
            None => match self.state.lock().received.last() {
                Some(&max) => max,
                None => return (false, None),
            },
        };
        let skipped = i128::from(seq) - i128::from(last) - 1;
        if skipped > 0 {
            tracing::warn!("Sequence gap: {} missing between {} and {}", skipped, last, seq);
            (true, Some(i64::try_from(skipped).unwrap_or(i64::MAX)))
        } else {
            (false, None)
        }
    }

    /// Received numbers in ascending order
    pub fn received(&self) -> Vec<i64> {
        self.state.lock().received.iter().copied().collect()
    }

    /// Numbers absent between the lowest and highest received, ascending.
    /// At most [`MAX_LISTED_MISSING`] are listed; `gap_report` counts them all.
    pub fn missing_sequences(&self) -> Vec<i64> {
        self.missing_ranges()
            .into_iter()
            .flat_map(|(start, end)| start..=end)
            .take(MAX_LISTED_MISSING)
            .collect()
    }

    /// Holes between neighbouring received numbers, as inclusive ranges
    pub fn missing_ranges(&self) -> Vec<(i64, i64)> {
        let state = self.state.lock();
        state
            .received
            .iter()
            .zip(state.received.iter().skip(1))
            .filter(|&(&low, &high)| low + 1 < high)
            .map(|(&low, &high)| (low + 1, high - 1))
            .collect()
    }

    /// Summary of the current holes
    pub fn gap_report(&self) -> GapReport {
        GapReport::from_ranges(self.missing_ranges())
    }

    /// Restart issuing from the configured initial value and forget
    /// everything received
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.next = self.config.initial_sequence;
        state.received.clear();
    }
}

impl Default for SequenceNumberManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Stateless MSH-13 check
pub fn validate_message_sequence(
    message: &Message,
    expected: Option<i64>,
) -> (bool, Option<SequenceError>) {
    match read_sequence(message, expected) {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e)),
    }
}

fn read_sequence(message: &Message, expected: Option<i64>) -> Result<Option<i64>, SequenceError> {
    let header = message.header().ok_or(SequenceError::MissingHeader)?;
    let raw = match header.field_value(MSH_SEQUENCE_NUMBER).map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(None),
    };
    let seq: i64 = raw
        .parse()
        .map_err(|_| SequenceError::InvalidFormat(raw.to_string()))?;
    match expected {
        Some(expected) if expected != seq => Err(SequenceError::Mismatch {
            expected,
            actual: seq,
        }),
        _ => Ok(Some(seq)),
    }
}

/// Missing numbers collapsed into ranges
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GapReport {
    /// Inclusive ranges, ascending
    pub ranges: Vec<(i64, i64)>,
    pub total_missing: usize,
}

impl GapReport {
    pub fn from_missing(missing: &[i64]) -> Self {
        let mut sorted = missing.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut ranges: Vec<(i64, i64)> = Vec::new();
        for &n in &sorted {
            match ranges.last_mut() {
                Some((_, end)) if end.checked_add(1) == Some(n) => *end = n,
                _ => ranges.push((n, n)),
            }
        }
        GapReport {
            ranges,
            total_missing: sorted.len(),
        }
    }

    /// Report over inclusive, ascending, non-overlapping ranges. The total
    /// saturates at `usize::MAX`.
    pub fn from_ranges(ranges: Vec<(i64, i64)>) -> Self {
        let total: u128 = ranges
            .iter()
            .map(|&(start, end)| (i128::from(end) - i128::from(start) + 1).max(0) as u128)
            .fold(0, u128::saturating_add);
        GapReport {
            ranges,
            total_missing: usize::try_from(total).unwrap_or(usize::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_missing == 0
    }

    /// Human-readable report lines
    pub fn lines(&self) -> Vec<String> {
        if self.is_empty() {
            return vec!["No missing sequence numbers".to_string()];
        }
        let ranges: Vec<String> = self
            .ranges
            .iter()
            .map(|&(start, end)| {
                if start == end {
                    start.to_string()
                } else {
                    format!("{}-{}", start, end)
                }
            })
            .collect();
        vec![
            format!("Missing sequence numbers: {}", ranges.join(", ")),
            format!("Total missing messages: {}", self.total_missing),
        ]
    }
}

impl fmt::Display for GapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines().join("\n"))
    }
}
