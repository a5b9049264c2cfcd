//! Threaded stress runs for session state
//!
//! Hammers one [`SequenceNumberManager`] and one
//! [`MessageCorrelationTracker`] from several threads and checks that
//! nothing was lost or handed out twice.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hl7v2_core::{EncodingCharacters, Field, Message, Segment, MSH_CONTROL_ID, MSH_SEQUENCE_NUMBER};
use hl7v2_session::{generate_ack, AckCode, MessageCorrelationTracker, SequenceNumberManager};

/// Stress run configuration
#[derive(Clone, Debug)]
pub struct StressConfig {
    /// Worker threads
    pub threads: usize,
    /// Messages each worker sends
    pub messages_per_thread: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        StressConfig {
            threads: 8,
            messages_per_thread: 250,
        }
    }
}

impl StressConfig {
    /// Small run for unit tests
    pub fn light() -> Self {
        StressConfig {
            threads: 4,
            messages_per_thread: 50,
        }
    }
}

/// Result of a stress run
#[derive(Debug, Clone)]
pub struct StressReport {
    /// Sequence numbers handed out
    pub issued: usize,
    /// Numbers handed out more than once
    pub duplicates: usize,
    /// Received numbers that never made it into the manager
    pub unrecorded: usize,
    /// Conversations open at the end
    pub conversations: usize,
    /// Control ids whose lookup did not return their own conversation
    pub misrouted: usize,
    pub elapsed: Duration,
}

impl StressReport {
    /// Check if the run passed
    pub fn passed(&self) -> bool {
        self.duplicates == 0 && self.unrecorded == 0 && self.misrouted == 0
    }
}

/// Build a bare message carrying a control id and sequence number
pub fn stress_message(control_id: &str, sequence: i64) -> Message {
    let encoding = EncodingCharacters::default();
    let mut msh = Segment::header("MSH", &encoding);
    msh.set_field(3, Field::from_value("STRESS"));
    msh.set_field(9, Field::from_components(["ADT", "A08"]));
    msh.set_field(MSH_CONTROL_ID, Field::from_value(control_id));
    msh.set_field(11, Field::from_value("P"));
    msh.set_field(12, Field::from_value("2.5"));
    msh.set_field(MSH_SEQUENCE_NUMBER, Field::from_value(sequence.to_string()));
    let mut message = Message::new(encoding).with_version("2.5");
    message.push_segment(msh);
    message
}

/// Run every worker against shared state
pub fn run_stress(config: &StressConfig) -> StressReport {
    let sequences = Arc::new(SequenceNumberManager::new());
    let tracker = Arc::new(MessageCorrelationTracker::new());
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|worker| {
            let sequences = Arc::clone(&sequences);
            let tracker = Arc::clone(&tracker);
            let count = config.messages_per_thread;
            thread::spawn(move || {
                let mut sent = Vec::with_capacity(count);
                for n in 0..count {
                    let seq = sequences.next_sequence();
                    let control_id = format!("W{}-{}", worker, n);
                    let message = stress_message(&control_id, seq);
                    sequences.validate_sequence(&message, Some(seq));

                    let conversation = tracker.track_conversation(&message);
                    if let Ok(ack) = generate_ack(&message, AckCode::ApplicationAccept) {
                        tracker.add_to_conversation(conversation, &ack);
                    }
                    sent.push((seq, control_id, conversation));
                }
                sent
            })
        })
        .collect();

    let mut sent = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(batch) => sent.extend(batch),
            Err(_) => tracing::warn!("Stress worker panicked"),
        }
    }
    let elapsed = start.elapsed();

    let unique: BTreeSet<i64> = sent.iter().map(|(seq, _, _)| *seq).collect();
    let received: BTreeSet<i64> = sequences.received().into_iter().collect();
    let misrouted = sent
        .iter()
        .filter(|(_, control_id, conv)| tracker.get_conversation_for_message(control_id) != Some(*conv))
        .count();

    let report = StressReport {
        issued: sent.len(),
        duplicates: sent.len() - unique.len(),
        unrecorded: unique.difference(&received).count(),
        conversations: tracker.conversation_count(),
        misrouted,
        elapsed,
    };
    tracing::info!("Stress run finished: {:?}", report);
    report
}
