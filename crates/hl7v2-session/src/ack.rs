//! Acknowledgment message construction

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use hl7v2_core::{
    Component, Field, Hl7Error, Hl7Result, Message, Segment, DEFAULT_VERSION, MSH_CONTROL_ID,
    MSH_VERSION,
};

/// MSA-2, the acknowledged control id
pub const MSA_CONTROL_ID: usize = 2;

const FALLBACK_APPLICATION: &str = "ACK_APP";
const FALLBACK_FACILITY: &str = "ACK_FAC";
const FALLBACK_RECEIVING_APPLICATION: &str = "ORIG_APP";
const FALLBACK_RECEIVING_FACILITY: &str = "ORIG_FAC";

/// MSA-1 acknowledgment code
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AckCode {
    /// AA
    ApplicationAccept,
    /// AE
    ApplicationError,
    /// AR
    ApplicationReject,
    /// CA
    CommitAccept,
    /// CE
    CommitError,
    /// CR
    CommitReject,
}

impl AckCode {
    pub fn as_str(self) -> &'static str {
        match self {
            AckCode::ApplicationAccept => "AA",
            AckCode::ApplicationError => "AE",
            AckCode::ApplicationReject => "AR",
            AckCode::CommitAccept => "CA",
            AckCode::CommitError => "CE",
            AckCode::CommitReject => "CR",
        }
    }

    /// AA or CA
    pub fn is_accept(self) -> bool {
        matches!(self, AckCode::ApplicationAccept | AckCode::CommitAccept)
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AA" => Ok(AckCode::ApplicationAccept),
            "AE" => Ok(AckCode::ApplicationError),
            "AR" => Ok(AckCode::ApplicationReject),
            "CA" => Ok(AckCode::CommitAccept),
            "CE" => Ok(AckCode::CommitError),
            "CR" => Ok(AckCode::CommitReject),
            other => Err(format!("Invalid acknowledgment code: {}", other)),
        }
    }
}

/// Builds an ACK answering `original`
pub struct AckBuilder<'a> {
    original: &'a Message,
    code: AckCode,
    text: Option<String>,
    application: Option<String>,
    facility: Option<String>,
    control_id: Option<String>,
}

/// ACK with default settings
pub fn generate_ack(original: &Message, code: AckCode) -> Hl7Result<Message> {
    AckBuilder::new(original).code(code).build()
}

impl<'a> AckBuilder<'a> {
    pub fn new(original: &'a Message) -> Self {
        AckBuilder {
            original,
            code: AckCode::ApplicationAccept,
            text: None,
            application: None,
            facility: None,
            control_id: None,
        }
    }

    pub fn code(mut self, code: AckCode) -> Self {
        self.code = code;
        self
    }

    /// MSA-3 text message
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Override MSH-3 / MSH-4 of the ACK
    pub fn sending(mut self, application: impl Into<String>, facility: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self.facility = Some(facility.into());
        self
    }

    /// Fixed MSH-10 instead of a generated one
    pub fn control_id(mut self, control_id: impl Into<String>) -> Self {
        self.control_id = Some(control_id.into());
        self
    }

    pub fn build(self) -> Hl7Result<Message> {
        let original = self.original;
        let original_msh = original.header().ok_or(Hl7Error::MissingHeader)?;
        let encoding = original.encoding;
        let version = original.version().unwrap_or(DEFAULT_VERSION).to_string();
        let original_field = |index: usize| original_msh.field(index).cloned().filter(|f| !f.is_empty());

        let sending_app = match self.application {
            Some(app) => Field::from_value(app),
            None => original_field(5).unwrap_or_else(|| Field::from_value(FALLBACK_APPLICATION)),
        };
        let sending_facility = match self.facility {
            Some(fac) => Field::from_value(fac),
            None => original_field(6).unwrap_or_else(|| Field::from_value(FALLBACK_FACILITY)),
        };
        let now = Local::now();
        let control_id = self.control_id.unwrap_or_else(|| {
            format!("ACK{}{:04X}", now.format("%Y%m%d%H%M%S"), rand::random::<u16>())
        });
        let trigger = original
            .message_type()
            .map(|(_, trigger)| trigger)
            .unwrap_or("");
        let processing_id = original_field(11).unwrap_or_else(|| Field::from_value("P"));

        let mut msh = Segment::header("MSH", &encoding);
        msh.set_field(3, sending_app);
        msh.set_field(4, sending_facility);
        msh.set_field(
            5,
            original_field(3).unwrap_or_else(|| Field::from_value(FALLBACK_RECEIVING_APPLICATION)),
        );
        msh.set_field(
            6,
            original_field(4).unwrap_or_else(|| Field::from_value(FALLBACK_RECEIVING_FACILITY)),
        );
        msh.set_field(7, Field::from_value(now.format("%Y%m%d%H%M%S").to_string()));
        msh.set_field(
            9,
            Field::new(vec![
                Component::from_value("ACK"),
                Component::from_value(trigger),
                Component::from_value("ACK"),
            ]),
        );
        msh.set_field(MSH_CONTROL_ID, Field::from_value(control_id));
        msh.set_field(11, processing_id);
        msh.set_field(MSH_VERSION, Field::from_value(version.clone()));

        let mut msa = Segment::new("MSA");
        msa.push_field(Field::from_value(self.code.as_str()));
        msa.push_field(Field::from_value(original.control_id().unwrap_or("")));
        if let Some(text) = self.text {
            msa.push_field(Field::from_value(text));
        }

        let mut ack = Message::new(encoding).with_version(version);
        ack.push_segment(msh);
        ack.push_segment(msa);
        tracing::debug!(
            "Built {} ACK for {:?}",
            self.code,
            original.control_id()
        );
        Ok(ack)
    }
}
