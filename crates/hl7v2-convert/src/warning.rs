//! Non-fatal migration findings

use thiserror::Error;

fn binding(table: &Option<String>) -> &str {
    table.as_deref().unwrap_or("none")
}

/// Something the migration changed, dropped, or could not verify
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionWarning {
    #[error("Source version {version} is not fully supported, conversion may be incomplete")]
    UnsupportedSourceVersion { version: String },

    #[error("Converting from {source_version} down to {target_version} may lose data")]
    Downgrade {
        source_version: String,
        target_version: String,
    },

    #[error("Segment {segment} does not exist in target version and was dropped")]
    SegmentDropped { segment: String },

    #[error("Segment {segment} field {field} does not exist in target version and was dropped")]
    FieldDropped { segment: String, field: usize },

    #[error("Segment {segment} field {field} data type changed from {from} to {to}")]
    DataTypeChanged {
        segment: String,
        field: usize,
        from: String,
        to: String,
    },

    #[error(
        "Segment {segment} field {field} table binding changed from {} to {}",
        binding(.from),
        binding(.to)
    )]
    TableBindingChanged {
        segment: String,
        field: usize,
        from: Option<String>,
        to: Option<String>,
    },

    #[error("Segment {segment} field {field} value '{code}' is not valid for table {table}: {reason}")]
    InvalidTableValue {
        segment: String,
        field: usize,
        table: String,
        code: String,
        reason: String,
    },
}
