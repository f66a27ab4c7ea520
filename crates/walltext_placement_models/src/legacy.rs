use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use walltext_core::{pose::TripleError, Pose, Result, WallTextError};

/// One entry of a `maps/<map>.json` file.
/// Written in camelCase, read in camelCase or in the PascalCase of older files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "groupNumber", alias = "GroupNumber", default)]
    pub group_number: i32,
    #[serde(alias = "Location", default)]
    pub location: String,
    #[serde(alias = "Rotation", default)]
    pub rotation: String,
}

impl FileRecord {
    pub fn new(group_number: i32, pose: &Pose) -> Self {
        Self {
            group_number,
            location: pose.location_text(),
            rotation: pose.angle_text(),
        }
    }

    pub fn pose(&self) -> Result<Pose, TripleError> {
        Pose::parse(&self.location, &self.rotation)
    }

    /// Checks done on every entry before it is queued for import. `origin` names the entry in
    /// the error.
    pub fn validate(&self, origin: &str) -> Result<Pose> {
        if self.group_number <= 0 {
            return Err(WallTextError::malformed(
                origin,
                format!("group number {} is not positive", self.group_number),
            ));
        }
        self.pose().map_err(|e| WallTextError::malformed(origin, e))
    }
}

/// Map name of a legacy file: its stem, without a trailing `_text`.
pub fn map_name_from_file_stem(stem: &str) -> &str {
    const SUFFIX: &str = "_text";
    if stem.len() > SUFFIX.len() {
        let split = stem.len() - SUFFIX.len();
        if stem.is_char_boundary(split) && stem[split..].eq_ignore_ascii_case(SUFFIX) {
            return &stem[..split];
        }
    }
    stem
}

/// A validated legacy entry waiting for its insert. Lives only for one import run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportEntry {
    pub map_name: SmolStr,
    pub group_number: i32,
    pub pose: Pose,
}

#[cfg(test)]
mod test {
    use super::*;
    use glam::Vec3;
    use rstest::rstest;

    #[rstest]
    #[case("de_dust2", "de_dust2")]
    #[case("de_dust2_text", "de_dust2")]
    #[case("de_dust2_TEXT", "de_dust2")]
    #[case("_text", "_text")]
    #[case("text", "text")]
    fn test_map_name_from_file_stem(#[case] stem: &str, #[case] expected: &str) {
        assert_eq!(map_name_from_file_stem(stem), expected);
    }

    #[test]
    fn test_reads_both_property_casings() {
        let records: Vec<FileRecord> = serde_json::from_str(
            r#"[
                { "GroupNumber": 2, "Location": "1 2 3", "Rotation": "0 90 0" },
                { "groupNumber": 1, "location": "4 5 6", "rotation": "0 0 0" }
            ]"#,
        )
        .unwrap();
        assert_eq!(records[0].group_number, 2);
        assert_eq!(records[1].location, "4 5 6");
    }

    #[test]
    fn test_writes_camel_case() {
        let pose = Pose::new(Vec3::new(1.5, 2.0, -3.25), Vec3::new(0.0, 90.0, 0.0));
        let json = serde_json::to_string(&FileRecord::new(4, &pose)).unwrap();
        similar_asserts::assert_eq!(
            json,
            r#"{"groupNumber":4,"location":"1.5 2 -3.25","rotation":"0 90 0"}"#
        );
    }

    #[rstest]
    #[case(FileRecord { group_number: 0, location: "1 2 3".into(), rotation: "0 0 0".into() })]
    #[case(FileRecord { group_number: 1, location: "1 2".into(), rotation: "0 0 0".into() })]
    #[case(FileRecord { group_number: 1, location: "1 2 3".into(), rotation: "a 0 0".into() })]
    #[case(FileRecord { group_number: 1, location: "".into(), rotation: "0 0 0".into() })]
    fn test_validate_rejects(#[case] record: FileRecord) {
        let err = record.validate("m.json entry 1").unwrap_err();
        assert!(
            matches!(&err, WallTextError::MalformedRecord { origin, .. } if origin == "m.json entry 1"),
            "{err:?}"
        );
    }

    #[test]
    fn test_validate_accepts() {
        let record = FileRecord {
            group_number: 3,
            location: "1 2.5 -3".into(),
            rotation: "0 90 0".into(),
        };
        let pose = record.validate("m.json").unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 2.5, -3.0));
        assert_eq!(pose.orientation, Vec3::new(0.0, 90.0, 0.0));
    }
}
