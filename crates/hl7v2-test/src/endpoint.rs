//! Simulated HL7 endpoint
//!
//! Wires the codec, migration engine and session state together the way a
//! receiving application would: parse, check sequencing, optionally migrate,
//! track the conversation and answer with an ACK.

use hl7v2_convert::{ConversionWarning, ProfileRegistry, VersionConverter};
use hl7v2_core::{ConversationId, Field, Hl7Result, Message, MSH_SEQUENCE_NUMBER};
use hl7v2_session::{AckBuilder, AckCode, MessageCorrelationTracker, SequenceNumberManager};
use hl7v2_wire::{Er7Parser, Er7Serializer, ParseOptions, SerializeOptions};

/// Endpoint configuration
#[derive(Clone, Debug)]
pub struct EndpointConfig {
    pub application: String,
    pub facility: String,
    /// Parse inbound text leniently
    pub tolerant: bool,
    /// Migrate inbound messages to this version before accepting them
    pub target_version: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            application: "SIM_APP".to_string(),
            facility: "SIM_FAC".to_string(),
            tolerant: false,
            target_version: None,
        }
    }
}

/// What happened to one inbound message
#[derive(Debug)]
pub struct ReceiveOutcome {
    /// Parsed (and possibly migrated) message
    pub message: Message,
    /// Reply, absent when the inbound message was itself an ACK
    pub ack: Option<Message>,
    pub ack_text: Option<String>,
    pub conversation: Option<ConversationId>,
    pub warnings: Vec<ConversionWarning>,
    /// Skipped sequence numbers before this message
    pub gap: Option<i64>,
}

impl ReceiveOutcome {
    /// MSA-1 of the reply
    pub fn ack_code(&self) -> Option<&str> {
        self.ack
            .as_ref()
            .and_then(|ack| ack.segment("MSA"))
            .and_then(|msa| msa.field_value(1))
    }
}

/// A single receiving application
pub struct SimulatedEndpoint {
    config: EndpointConfig,
    parser: Er7Parser,
    serializer: Er7Serializer,
    profiles: ProfileRegistry,
    sequences: SequenceNumberManager,
    tracker: MessageCorrelationTracker,
}

impl SimulatedEndpoint {
    pub fn new(config: EndpointConfig, profiles: ProfileRegistry) -> Self {
        let options = if config.tolerant {
            ParseOptions::tolerant()
        } else {
            ParseOptions::default()
        };
        SimulatedEndpoint {
            config,
            parser: Er7Parser::new(options),
            serializer: Er7Serializer::new(SerializeOptions::default()),
            profiles,
            sequences: SequenceNumberManager::new(),
            tracker: MessageCorrelationTracker::new(),
        }
    }

    pub fn tracker(&self) -> &MessageCorrelationTracker {
        &self.tracker
    }

    pub fn sequences(&self) -> &SequenceNumberManager {
        &self.sequences
    }

    /// Handle one inbound message
    pub fn receive(&self, text: &str) -> Hl7Result<ReceiveOutcome> {
        let parsed = self.parser.parse(text)?;

        if parsed.segment("MSA").is_some() {
            let conversation = self.tracker.conversation_for_ack(&parsed);
            if let Some(id) = conversation {
                self.tracker.add_to_conversation(id, &parsed);
            } else {
                tracing::warn!("ACK for unknown message {:?}", parsed.control_id());
            }
            return Ok(ReceiveOutcome {
                message: parsed,
                ack: None,
                ack_text: None,
                conversation,
                warnings: Vec::new(),
                gap: None,
            });
        }

        let (_, gap) = self.sequences.check_gap(&parsed, None);
        let (sequence_ok, sequence_error) = self.sequences.validate_sequence(&parsed, None);

        let mut warnings = Vec::new();
        let mut code = AckCode::ApplicationAccept;
        let mut note = None;
        let mut message = parsed;

        if let Some(error) = sequence_error.filter(|_| !sequence_ok) {
            code = AckCode::ApplicationReject;
            note = Some(error.to_string());
        } else if let Some(target) = &self.config.target_version {
            match VersionConverter::new(&self.profiles).convert(&message, target) {
                Ok((converted, found)) => {
                    message = converted;
                    warnings = found;
                }
                Err(e) => {
                    code = AckCode::ApplicationError;
                    note = Some(e.to_string());
                }
            }
        }

        let mut builder = AckBuilder::new(&message)
            .code(code)
            .sending(self.config.application.clone(), self.config.facility.clone());
        if let Some(note) = note {
            builder = builder.text(note);
        }
        let ack = builder.build()?;
        let ack_text = self.serializer.serialize(&ack)?;

        let conversation = self.tracker.track_conversation(&message);
        self.tracker.add_to_conversation(conversation, &ack);

        Ok(ReceiveOutcome {
            message,
            ack: Some(ack),
            ack_text: Some(ack_text),
            conversation: Some(conversation),
            warnings,
            gap,
        })
    }

    /// Stamp the next outgoing sequence number into MSH-13, start a
    /// conversation for it and render it
    pub fn send(&self, message: &mut Message) -> Hl7Result<(ConversationId, String)> {
        let seq = self.sequences.next_sequence();
        if let Some(msh) = message.header_mut() {
            msh.set_field(MSH_SEQUENCE_NUMBER, Field::from_value(seq.to_string()));
        }
        let conversation = self.tracker.track_conversation(message);
        let text = self.serializer.serialize(message)?;
        Ok((conversation, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{sample_profiles, ADT_A01_V23, ORU_R01_V25};
    use hl7v2_core::{Hl7Error, ParseErrorKind};
    use hl7v2_wire::parse_message;

    fn endpoint() -> SimulatedEndpoint {
        crate::init_tracing();
        SimulatedEndpoint::new(EndpointConfig::default(), sample_profiles())
    }

    #[test]
    fn test_receive_and_ack() {
        let ep = endpoint();
        let outcome = ep.receive(ORU_R01_V25).unwrap();
        assert_eq!(outcome.ack_code(), Some("AA"));

        let ack_text = outcome.ack_text.as_deref().unwrap();
        let ack = parse_message(ack_text).unwrap();
        assert_eq!(ack.header().unwrap().field_value(3), Some("SIM_APP"));
        assert_eq!(ack.header().unwrap().field_value(5), Some("LAB"));
        assert_eq!(ack.segment("MSA").unwrap().field_value(2), Some("LAB0001"));

        let conv = outcome.conversation.unwrap();
        assert_eq!(ep.tracker().get_conversation(conv).len(), 2);
        assert_eq!(ep.tracker().get_conversation_for_message("LAB0001"), Some(conv));
        assert_eq!(ep.sequences().received(), vec![42]);
    }

    #[test]
    fn test_gap_reported() {
        let ep = endpoint();
        ep.receive(ORU_R01_V25).unwrap();
        let later = ORU_R01_V25
            .replace("|LAB0001|P|2.5|42", "|LAB0002|P|2.5|45");
        let outcome = ep.receive(&later).unwrap();
        assert_eq!(outcome.gap, Some(2));
        assert_eq!(outcome.ack_code(), Some("AA"));
        assert_eq!(ep.sequences().missing_sequences(), vec![43, 44]);
    }

    #[test]
    fn test_bad_sequence_rejected() {
        let ep = endpoint();
        let text = ORU_R01_V25.replace("|P|2.5|42", "|P|2.5|forty");
        let outcome = ep.receive(&text).unwrap();
        assert_eq!(outcome.ack_code(), Some("AR"));
        let msa = outcome.ack.as_ref().unwrap().segment("MSA").unwrap();
        assert!(msa.field_value(3).unwrap().contains("forty"));
    }

    #[test]
    fn test_migrating_endpoint() {
        let config = EndpointConfig {
            target_version: Some("2.5".to_string()),
            ..EndpointConfig::default()
        };
        let ep = SimulatedEndpoint::new(config, sample_profiles());
        let outcome = ep.receive(ADT_A01_V23).unwrap();
        assert_eq!(outcome.message.version(), Some("2.5"));
        assert_eq!(outcome.ack.as_ref().unwrap().version(), Some("2.5"));
        // NK1-3 is CE bound to 0063 in both, no table loaded, nothing to flag
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
    }

    #[test]
    fn test_unsupported_target_answers_ae() {
        let config = EndpointConfig {
            target_version: Some("2.9".to_string()),
            ..EndpointConfig::default()
        };
        let ep = SimulatedEndpoint::new(config, sample_profiles());
        let outcome = ep.receive(ADT_A01_V23).unwrap();
        assert_eq!(outcome.ack_code(), Some("AE"));
    }

    #[test]
    fn test_ack_joins_conversation() {
        let sender = endpoint();
        let receiver = endpoint();

        let mut outbound = parse_message(ADT_A01_V23).unwrap();
        let (conv, text) = sender.send(&mut outbound).unwrap();
        assert_eq!(outbound.sequence_number(), Some("1"));

        let reply = receiver.receive(&text).unwrap();
        let back = sender.receive(reply.ack_text.as_deref().unwrap()).unwrap();
        assert!(back.ack.is_none());
        assert_eq!(back.conversation, Some(conv));
        assert_eq!(sender.tracker().get_conversation(conv).len(), 2);
    }

    #[test]
    fn test_parse_failure_surfaces() {
        let ep = endpoint();
        let err = ep.receive("PID|1\r").unwrap_err();
        assert!(matches!(err, Hl7Error::Parse(ref p) if matches!(p.kind, ParseErrorKind::MissingHeader(_))));
    }

    #[test]
    fn test_tolerant_endpoint() {
        let config = EndpointConfig {
            tolerant: true,
            ..EndpointConfig::default()
        };
        let ep = SimulatedEndpoint::new(config, sample_profiles());
        let text = "PID|1||7\rMSH|^~\\&|A|B|C|D|||ADT^A04|T1|P|2.5\r";
        let outcome = ep.receive(text).unwrap();
        assert_eq!(outcome.ack_code(), Some("AA"));
        assert_eq!(outcome.message.segments[0].name, "MSH");
    }
}
