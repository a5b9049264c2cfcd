//! Migration planning between two versions

use std::cmp::Ordering;
use std::collections::BTreeSet;

use hl7v2_core::compare_versions;

use crate::profile::{FieldDef, ProfileService};
use crate::warning::ConversionWarning;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationDirection {
    Upgrade,
    Downgrade,
    /// Same version, or ordering unknown
    Lateral,
}

/// What happens to one field position
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldDisposition {
    /// Defined in both versions
    Retained { source: FieldDef, target: FieldDef },
    /// Defined only in the target version
    Introduced { target: FieldDef },
    /// Defined only in the source version
    Dropped { source: FieldDef },
    /// Defined in neither, copied unvalidated
    Passthrough,
}

impl FieldDisposition {
    /// Target-side definition, if any
    pub fn target(&self) -> Option<&FieldDef> {
        match self {
            FieldDisposition::Retained { target, .. } | FieldDisposition::Introduced { target } => {
                Some(target)
            }
            _ => None,
        }
    }
}

/// Segment-level differences between two versions
#[derive(Clone, Debug)]
pub struct MigrationPlan {
    pub source_version: String,
    pub target_version: String,
    pub direction: MigrationDirection,
    pub segments_added: Vec<String>,
    pub segments_removed: Vec<String>,
    pub warnings: Vec<ConversionWarning>,
}

impl MigrationPlan {
    pub fn build(profiles: &dyn ProfileService, source: &str, target: &str) -> Self {
        let mut warnings = Vec::new();
        if !profiles.is_version_supported(source) {
            warnings.push(ConversionWarning::UnsupportedSourceVersion {
                version: source.to_string(),
            });
        }

        let direction = match compare_versions(source, target) {
            Ordering::Less => MigrationDirection::Upgrade,
            Ordering::Greater => MigrationDirection::Downgrade,
            Ordering::Equal => MigrationDirection::Lateral,
        };
        if direction == MigrationDirection::Downgrade {
            warnings.push(ConversionWarning::Downgrade {
                source_version: source.to_string(),
                target_version: target.to_string(),
            });
        }

        let before: BTreeSet<String> = profiles.segment_names(source).into_iter().collect();
        let after: BTreeSet<String> = profiles.segment_names(target).into_iter().collect();

        MigrationPlan {
            source_version: source.to_string(),
            target_version: target.to_string(),
            direction,
            segments_added: after.difference(&before).cloned().collect(),
            segments_removed: before.difference(&after).cloned().collect(),
            warnings,
        }
    }

    pub fn field_disposition(
        &self,
        profiles: &dyn ProfileService,
        segment: &str,
        index: usize,
    ) -> FieldDisposition {
        let source = profiles.field_definition(&self.source_version, segment, index);
        let target = profiles.field_definition(&self.target_version, segment, index);
        match (source, target) {
            (Some(source), Some(target)) => FieldDisposition::Retained { source, target },
            (None, Some(target)) => FieldDisposition::Introduced { target },
            (Some(source), None) => FieldDisposition::Dropped { source },
            (None, None) => FieldDisposition::Passthrough,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ProfileRegistry, SegmentDef};

    fn profiles() -> ProfileRegistry {
        ProfileRegistry::new()
            .with_segment("2.3", SegmentDef::new("PID").field(8, FieldDef::new("IS")))
            .with_segment("2.3", SegmentDef::new("ZOL"))
            .with_segment(
                "2.5",
                SegmentDef::new("PID")
                    .field(8, FieldDef::new("IS").bound_to("0001"))
                    .field(39, FieldDef::new("CWE")),
            )
            .with_segment("2.5", SegmentDef::new("PD1"))
    }

    #[test]
    fn test_upgrade_plan() {
        let plan = MigrationPlan::build(&profiles(), "2.3", "2.5");
        assert_eq!(plan.direction, MigrationDirection::Upgrade);
        assert_eq!(plan.segments_added, vec!["PD1".to_string()]);
        assert_eq!(plan.segments_removed, vec!["ZOL".to_string()]);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_downgrade_and_unsupported_source() {
        let plan = MigrationPlan::build(&profiles(), "2.7", "2.3");
        assert_eq!(plan.direction, MigrationDirection::Downgrade);
        assert_eq!(plan.warnings.len(), 2);
        assert!(matches!(plan.warnings[0], ConversionWarning::UnsupportedSourceVersion { .. }));
    }

    #[test]
    fn test_field_disposition() {
        let profiles = profiles();
        let plan = MigrationPlan::build(&profiles, "2.3", "2.5");
        assert!(matches!(
            plan.field_disposition(&profiles, "PID", 8),
            FieldDisposition::Retained { .. }
        ));
        assert!(matches!(
            plan.field_disposition(&profiles, "PID", 39),
            FieldDisposition::Introduced { .. }
        ));
        assert_eq!(plan.field_disposition(&profiles, "PID", 2), FieldDisposition::Passthrough);

        let back = MigrationPlan::build(&profiles, "2.5", "2.3");
        assert!(matches!(
            back.field_disposition(&profiles, "PID", 39),
            FieldDisposition::Dropped { .. }
        ));
    }
}
