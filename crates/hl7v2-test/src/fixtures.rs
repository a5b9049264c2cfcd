//! Sample messages and profiles

use hl7v2_convert::{FieldDef, ProfileRegistry, SegmentDef};

/// ADT^A01 in 2.3
pub const ADT_A01_V23: &str = "MSH|^~\\&|REGADT|MCM|IFENG||199112311501||ADT^A01|000001|P|2.3|||\r\
EVN|A01|199112311501\r\
PID|1||191919^^^GENHOS^MR~371-66-9256^^^USSSA^SS||MASSIE^JAMES^A||19560129|M|||171 ZOBERLEIN^^ISHPEMING^MI^49849\r\
NK1|1|MASSIE^ELLEN|SPOUSE\r\
PV1|1|I|ICU^101^A|||||||SUR\r";

/// ORU^R01 in 2.5 with escapes, a null field and repetitions
pub const ORU_R01_V25: &str = "MSH|^~\\&|LAB|HOSP|EHR|CLINIC|20240315083000||ORU^R01^ORU_R01|LAB0001|P|2.5|42\r\
PID|1||555^^^HOSP^MR||DOE^JANE||19700101|F\r\
OBR|1|ORD1|FIL1|57021-8^CBC^LN\r\
OBX|1|NM|718-7^Hemoglobin^LN||13.2|g/dL^grams per deciliter|12.0-16.0|N|||F\r\
OBX|2|FT|NOTE^Comment||Specimen hemolyzed\\.br\\Redraw advised \\F\\ see lab|||||\"\"|F\r";

/// Batch file wrapping one message
pub const BATCH_FILE: &str = "FHS|^~\\&|LAB|HOSP\r\
BHS|^~\\&|LAB|HOSP\r\
MSH|^~\\&|LAB|HOSP|EHR|CLINIC|20240315083000||ORU^R01|LAB0002|P|2.5\r\
PID|1||556\r\
BTS|1\r\
FTS|1\r";

/// Fixture profiles for 2.3, 2.5 and 2.7
pub fn sample_profiles() -> ProfileRegistry {
    let mut registry = ProfileRegistry::new();
    for version in ["2.3", "2.5", "2.7"] {
        let timestamp = if version == "2.7" { "DTM" } else { "TS" };
        let coded = if version == "2.3" { "CE" } else { "CWE" };

        registry.add_segment(
            version,
            SegmentDef::new("EVN")
                .field(1, FieldDef::new("ID").bound_to("0003"))
                .field(2, FieldDef::new(timestamp)),
        );
        let mut pid = SegmentDef::new("PID")
            .field(1, FieldDef::new("SI"))
            .field(3, FieldDef::new("CX"))
            .field(5, FieldDef::new("XPN"))
            .field(7, FieldDef::new(timestamp))
            .field(8, FieldDef::new("IS").bound_to("0001"))
            .field(11, FieldDef::new("XAD"));
        if version != "2.3" {
            pid = pid.field(35, FieldDef::new(coded).bound_to("0446"));
        }
        registry.add_segment(version, pid);
        registry.add_segment(
            version,
            SegmentDef::new("PV1")
                .field(1, FieldDef::new("SI"))
                .field(2, FieldDef::new("IS").bound_to("0004"))
                .field(3, FieldDef::new("PL"))
                .field(10, FieldDef::new("IS").bound_to("0069")),
        );
        registry.add_segment(
            version,
            SegmentDef::new("OBR")
                .field(1, FieldDef::new("SI"))
                .field(2, FieldDef::new("EI"))
                .field(3, FieldDef::new("EI"))
                .field(4, FieldDef::new(coded)),
        );
        registry.add_segment(
            version,
            SegmentDef::new("OBX")
                .field(1, FieldDef::new("SI"))
                .field(2, FieldDef::new("ID").bound_to("0125"))
                .field(3, FieldDef::new(coded))
                .field(5, FieldDef::new("varies"))
                .field(6, FieldDef::new(coded))
                .field(7, FieldDef::new("ST"))
                .field(8, FieldDef::new("IS").bound_to("0078"))
                .field(11, FieldDef::new("ID").bound_to("0085")),
        );
        registry.add_segment(
            version,
            SegmentDef::new("MSA")
                .field(1, FieldDef::new("ID").bound_to("0008"))
                .field(2, FieldDef::new("ST")),
        );

        let mut sex = vec!["F", "M", "O", "U"];
        if version != "2.3" {
            sex.extend(["A", "N"]);
        }
        registry.add_table(version, "0001", sex);
        registry.add_table(version, "0003", ["A01", "A02", "A03", "A04", "A08"]);
        registry.add_table(version, "0004", ["E", "I", "O", "P", "R", "B"]);
        registry.add_table(version, "0008", ["AA", "AE", "AR", "CA", "CE", "CR"]);
        registry.add_table(version, "0078", ["L", "H", "LL", "HH", "N", "A", "AA"]);
        registry.add_table(version, "0085", ["C", "D", "F", "I", "N", "O", "P", "R", "S", "U", "W", "X"]);
        registry.add_table(version, "0125", ["AD", "CE", "CF", "CK", "CN", "CP", "CWE", "CX", "DT", "ED", "FT", "MO", "NM", "PN", "RP", "SN", "ST", "TM", "TN", "TS", "TX", "XAD", "XCN", "XON", "XPN", "XTN"]);
    }
    // NK1 only profiled in 2.3 and 2.5
    for version in ["2.3", "2.5"] {
        registry.add_segment(
            version,
            SegmentDef::new("NK1")
                .field(1, FieldDef::new("SI"))
                .field(2, FieldDef::new("XPN"))
                .field(3, FieldDef::new("CE").bound_to("0063")),
        );
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use hl7v2_convert::ProfileService;
    use hl7v2_wire::parse_message;

    #[test]
    fn test_fixtures_parse() {
        for text in [ADT_A01_V23, ORU_R01_V25, BATCH_FILE] {
            let msg = parse_message(text).unwrap();
            assert!(msg.header().is_some());
        }
    }

    #[test]
    fn test_sample_profiles() {
        let profiles = sample_profiles();
        assert!(profiles.is_version_supported("2.3"));
        assert!(profiles.is_version_supported("2.7"));
        assert!(!profiles.is_version_supported("2.4"));
        assert!(profiles.validate_table_value("0001", "A", "2.5").is_ok());
        assert!(profiles.validate_table_value("0001", "A", "2.3").is_err());
        assert!(profiles.segment_definition("2.7", "NK1").is_none());
    }
}
