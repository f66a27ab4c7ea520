//! Text form of positions and angles.
//!
//! Both backends store a triple as `"x y z"` with at most [`FRACTION_DIGITS`] fractional digits,
//! trailing zeros trimmed, `.` as decimal separator whatever the host locale is.
//! The relational uniqueness constraint compares these strings, so formatting must be byte stable.

use glam::Vec3;

pub const FRACTION_DIGITS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TripleError {
    #[error("expected 3 components, found {0}")]
    ComponentCount(usize),
    #[error("component #{index} ({raw:?}) is not a finite number")]
    NotANumber { index: usize, raw: String },
}

/// Position and orientation (pitch, yaw, roll) of a placement.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Vec3,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Vec3) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn offset(&self, position_delta: Vec3, orientation_delta: Vec3) -> Self {
        Self {
            position: self.position + position_delta,
            orientation: self.orientation + orientation_delta,
        }
    }

    pub fn lifted(&self, height: f32) -> Self {
        self.offset(Vec3::new(0.0, 0.0, height), Vec3::ZERO)
    }

    pub fn location_text(&self) -> String {
        format_triple(self.position)
    }
    pub fn angle_text(&self) -> String {
        format_triple(self.orientation)
    }

    pub fn parse(location: &str, angle: &str) -> Result<Self, TripleError> {
        Ok(Self {
            position: parse_triple(location)?,
            orientation: parse_triple(angle)?,
        })
    }
}

pub fn format_component(value: f32) -> String {
    let mut s = format!("{:.*}", FRACTION_DIGITS, value);
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_owned();
    }
    s
}

pub fn format_triple(v: Vec3) -> String {
    format!(
        "{} {} {}",
        format_component(v.x),
        format_component(v.y),
        format_component(v.z)
    )
}

pub fn parse_triple(s: &str) -> Result<Vec3, TripleError> {
    let parts: Vec<&str> = s.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(TripleError::ComponentCount(parts.len()));
    }
    let mut components = [0.0f32; 3];
    for (index, raw) in parts.iter().enumerate() {
        match raw.parse::<f32>() {
            Ok(value) if value.is_finite() => components[index] = value,
            _ => {
                return Err(TripleError::NotANumber {
                    index,
                    raw: raw.to_string(),
                })
            }
        }
    }
    Ok(Vec3::from_array(components))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0")]
    #[case(-0.0, "0")]
    #[case(-0.0004, "0")]
    #[case(12.5, "12.5")]
    #[case(3.0, "3")]
    #[case(-1822.25, "-1822.25")]
    #[case(0.1239, "0.124")]
    fn test_format_component(#[case] value: f32, #[case] expected: &str) {
        assert_eq!(format_component(value), expected);
    }

    #[rstest]
    #[case("1 2")]
    #[case("1 2 3 4")]
    #[case("")]
    #[case("1 two 3")]
    #[case("1,5 2 3")]
    #[case("NaN 0 0")]
    #[case("inf 0 0")]
    fn test_parse_rejects(#[case] raw: &str) {
        assert!(parse_triple(raw).is_err(), "{raw:?} should be rejected");
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let v = parse_triple("  1.5\t-2   3 ").unwrap();
        assert_eq!(v, Vec3::new(1.5, -2.0, 3.0));
    }

    #[test]
    fn test_round_trip_within_precision() {
        let samples = [
            Vec3::new(1822.4567, 417.0, -1256.1),
            Vec3::new(-0.0012, 0.9999, 359.999),
            Vec3::new(10000.333, -7.5, 0.0004),
        ];
        for v in samples {
            let text = format_triple(v);
            let back = parse_triple(&text).unwrap();
            assert!((back - v).abs().max_element() <= 0.0005 + f32::EPSILON * v.abs().max_element());
            // formatting is stable once quantized
            assert_eq!(format_triple(back), text);
        }
    }

    #[test]
    fn test_pose_offset() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(0.0, 90.0, 0.0));
        let moved = pose.offset(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -5.0, 0.0));
        assert_eq!(moved.position, Vec3::new(1.0, 7.0, 3.0));
        assert_eq!(moved.orientation, Vec3::new(0.0, 85.0, 0.0));
        assert_eq!(pose.lifted(10.0).position.z, 13.0);
    }
}
