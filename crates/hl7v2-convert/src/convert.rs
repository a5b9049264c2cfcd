//! Version migration engine
//!
//! Rewrites a message for another HL7 version field by field. Only a missing
//! source version or an unsupported target is fatal. Everything else the
//! engine notices is reported as a [`ConversionWarning`].

use hl7v2_core::{Component, ConversionError, Field, Message, Segment, MSH_VERSION};

use crate::plan::{FieldDisposition, MigrationPlan};
use crate::profile::{FieldDef, ProfileService};
use crate::warning::ConversionWarning;

/// Converted message plus everything worth reporting
pub type Conversion = (Message, Vec<ConversionWarning>);

/// Migration switches
#[derive(Clone, Copy, Debug)]
pub struct ConvertOptions {
    /// Keep segments the target version does not define
    pub preserve_unknown_segments: bool,
    /// Check coded values against target tables
    pub validate_table_values: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            preserve_unknown_segments: true,
            validate_table_values: true,
        }
    }
}

/// Convert `message` to `target_version`
pub fn convert(
    profiles: &dyn ProfileService,
    message: &Message,
    target_version: &str,
    preserve_unknown_segments: bool,
    validate_table_values: bool,
) -> Result<Conversion, ConversionError> {
    VersionConverter::new(profiles)
        .with_options(ConvertOptions {
            preserve_unknown_segments,
            validate_table_values,
        })
        .convert(message, target_version)
}

/// Rewrite MSH-12 only, leaving every other field untouched
pub fn convert_simple(message: &Message, target_version: &str) -> Message {
    let mut converted = message.clone();
    stamp_version(&mut converted, target_version);
    converted
}

/// Version of a message, from the model or MSH-12
pub fn source_version(message: &Message) -> Option<&str> {
    message
        .version()
        .filter(|v| !v.is_empty())
        .or_else(|| {
            message
                .header()
                .and_then(|msh| msh.field_value(MSH_VERSION))
                .filter(|v| !v.is_empty())
        })
}

fn stamp_version(message: &mut Message, target_version: &str) {
    for segment in message.segments.iter_mut().filter(|s| s.name == "MSH") {
        segment.set_field(MSH_VERSION, Field::from_value(target_version));
    }
    message.version = Some(target_version.to_string());
}

/// Profile-driven converter
pub struct VersionConverter<'a> {
    profiles: &'a dyn ProfileService,
    options: ConvertOptions,
}

impl<'a> VersionConverter<'a> {
    pub fn new(profiles: &'a dyn ProfileService) -> Self {
        VersionConverter {
            profiles,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn convert(&self, message: &Message, target_version: &str) -> Result<Conversion, ConversionError> {
        let source = source_version(message).ok_or(ConversionError::MissingSourceVersion)?;
        if !self.profiles.is_version_supported(target_version) {
            return Err(ConversionError::UnsupportedTargetVersion(target_version.to_string()));
        }

        let plan = MigrationPlan::build(self.profiles, source, target_version);
        let mut warnings = plan.warnings.clone();
        let mut converted = Message::new(message.encoding).with_version(target_version);

        for segment in &message.segments {
            if segment.is_header() {
                converted.push_segment(segment.clone());
                continue;
            }
            let known = self
                .profiles
                .segment_definition(target_version, &segment.name)
                .is_some();
            if !known && !self.options.preserve_unknown_segments {
                tracing::warn!("Dropping segment {} not defined in {}", segment.name, target_version);
                warnings.push(ConversionWarning::SegmentDropped {
                    segment: segment.name.clone(),
                });
                continue;
            }
            converted.push_segment(self.convert_segment(segment, &plan, &mut warnings));
        }

        stamp_version(&mut converted, target_version);
        tracing::debug!(
            "Converted message {} -> {} with {} warnings",
            source,
            target_version,
            warnings.len()
        );
        Ok((converted, warnings))
    }

    fn convert_segment(
        &self,
        segment: &Segment,
        plan: &MigrationPlan,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Segment {
        let mut fields = Vec::with_capacity(segment.fields.len());
        for (i, reps) in segment.fields.iter().enumerate() {
            let index = i + 1;
            let disposition = plan.field_disposition(self.profiles, &segment.name, index);

            if let FieldDisposition::Retained { source, target } = &disposition {
                report_definition_drift(&segment.name, index, source, target, warnings);
            }

            match &disposition {
                FieldDisposition::Dropped { .. } => {
                    tracing::warn!("Dropping {}-{} not defined in {}", segment.name, index, plan.target_version);
                    warnings.push(ConversionWarning::FieldDropped {
                        segment: segment.name.clone(),
                        field: index,
                    });
                    fields.push(vec![Field::empty()]);
                }
                FieldDisposition::Passthrough => fields.push(reps.clone()),
                FieldDisposition::Retained { .. } | FieldDisposition::Introduced { .. } => {
                    let table = disposition.target().and_then(|t| t.table_binding.as_deref());
                    if let (Some(table), true) = (table, self.options.validate_table_values) {
                        self.check_codes(&segment.name, index, table, reps, &plan.target_version, warnings);
                    }
                    fields.push(reps.clone());
                }
            }
        }

        let mut converted = Segment::with_fields(segment.name.clone(), fields);
        converted.set_original_field_count(segment.original_field_count());
        converted
    }

    fn check_codes(
        &self,
        segment: &str,
        index: usize,
        table: &str,
        reps: &[Field],
        version: &str,
        warnings: &mut Vec<ConversionWarning>,
    ) {
        // First subcomponent of every component in every repetition
        let codes = reps
            .iter()
            .filter(|f| !f.is_null)
            .flat_map(|f| f.components.iter().map(Component::value))
            .filter(|code| !code.is_empty());
        for code in codes {
            if let Err(reason) = self.profiles.validate_table_value(table, code, version) {
                tracing::warn!("{}-{} value '{}' failed table {}: {}", segment, index, code, table, reason);
                warnings.push(ConversionWarning::InvalidTableValue {
                    segment: segment.to_string(),
                    field: index,
                    table: table.to_string(),
                    code: code.to_string(),
                    reason,
                });
            }
        }
    }
}

fn report_definition_drift(
    segment: &str,
    index: usize,
    source: &FieldDef,
    target: &FieldDef,
    warnings: &mut Vec<ConversionWarning>,
) {
    if source.data_type != target.data_type {
        warnings.push(ConversionWarning::DataTypeChanged {
            segment: segment.to_string(),
            field: index,
            from: source.data_type.clone(),
            to: target.data_type.clone(),
        });
    }
    if source.table_binding != target.table_binding {
        warnings.push(ConversionWarning::TableBindingChanged {
            segment: segment.to_string(),
            field: index,
            from: source.table_binding.clone(),
            to: target.table_binding.clone(),
        });
    }
}
