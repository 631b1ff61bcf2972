// SPDX-License-Identifier: GPL-3.0-only

//! Core landmark types
//!
//! Landmark coordinates are normalized (0.0 to 1.0) relative to the frame
//! width and height, so they are independent of the capture resolution.

use crate::constants::LANDMARK_COUNT;
use crate::errors::{DecodeError, DecodeResult};
use serde::{Deserialize, Serialize, Serializer};

/// One normalized skeletal keypoint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LandmarkPoint {
    /// Horizontal position (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Vertical position (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Depth relative to the hips, same scale as `x`
    pub z: f32,
    /// Detection confidence, typically 0.0 to 1.0
    pub visibility: f32,
    /// Likelihood that the landmark is inside the frame, if reported
    pub presence: Option<f32>,
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
            presence: None,
        }
    }
}

/// Named indices of the 33 pose landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl PoseLandmark {
    /// Position of this landmark in a [`LandmarkSet`]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Exactly [`LANDMARK_COUNT`] landmarks in detection-engine order
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: [LandmarkPoint; LANDMARK_COUNT],
}

impl LandmarkSet {
    /// Build a set, rejecting anything that is not exactly [`LANDMARK_COUNT`] points
    pub fn from_points(points: Vec<LandmarkPoint>) -> DecodeResult<Self> {
        let actual = points.len();
        let points: [LandmarkPoint; LANDMARK_COUNT] =
            points
                .try_into()
                .map_err(|_| DecodeError::WrongCardinality {
                    expected: LANDMARK_COUNT,
                    actual,
                })?;
        Ok(Self { points })
    }

    /// Decode a serialized landmark list
    pub fn decode(payload: &[u8]) -> DecodeResult<Self> {
        let list: WireLandmarkList =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let points = list.landmark.into_iter().map(LandmarkPoint::from).collect();
        Self::from_points(points)
    }

    /// Point at a raw index
    pub fn get(&self, index: usize) -> Option<&LandmarkPoint> {
        self.points.get(index)
    }

    /// Point for a named landmark
    pub fn landmark(&self, landmark: PoseLandmark) -> &LandmarkPoint {
        &self.points[landmark.index()]
    }

    /// All landmarks in index order; always [`LANDMARK_COUNT`] of them
    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }
}

impl std::fmt::Display for LandmarkSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pose landmarks: {}", self.points.len())
    }
}

/// Serialize landmarks in the detection engine's payload format
///
/// Accepts any number of points so callers can build invalid payloads too.
pub fn encode_payload(points: &[LandmarkPoint]) -> Vec<u8> {
    let list = WireLandmarkList {
        landmark: points.iter().copied().map(WireLandmark::from).collect(),
    };
    // A Vec of plain structs cannot fail to serialize
    serde_json::to_vec(&list).unwrap_or_default()
}

/// Serialized landmark list as produced by the detection engine
#[derive(Debug, Serialize, Deserialize)]
struct WireLandmarkList {
    landmark: Vec<WireLandmark>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireLandmark {
    x: f32,
    y: f32,
    #[serde(default)]
    z: f32,
    #[serde(default)]
    visibility: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    presence: Option<f32>,
}

impl From<WireLandmark> for LandmarkPoint {
    fn from(wire: WireLandmark) -> Self {
        Self {
            x: wire.x,
            y: wire.y,
            z: wire.z,
            visibility: wire.visibility,
            presence: wire.presence,
        }
    }
}

impl From<LandmarkPoint> for WireLandmark {
    fn from(point: LandmarkPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            visibility: point.visibility,
            presence: point.presence,
        }
    }
}

/// Number of tracked joints
pub const JOINT_COUNT: usize = 6;

/// Tracked joints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    RightArm,
    LeftArm,
    RightKnee,
    LeftKnee,
    RightShoulder,
    LeftShoulder,
}

impl Joint {
    /// All tracked joints in report order
    pub const ALL: [Joint; JOINT_COUNT] = [
        Joint::RightArm,
        Joint::LeftArm,
        Joint::RightKnee,
        Joint::LeftKnee,
        Joint::RightShoulder,
        Joint::LeftShoulder,
    ];

    /// Landmarks forming the joint: (first ray end, vertex, second ray end)
    pub fn landmarks(self) -> (PoseLandmark, PoseLandmark, PoseLandmark) {
        use PoseLandmark::*;
        match self {
            Joint::RightArm => (RightWrist, RightElbow, RightShoulder),
            Joint::LeftArm => (LeftWrist, LeftElbow, LeftShoulder),
            Joint::RightKnee => (RightHip, RightKnee, RightAnkle),
            Joint::LeftKnee => (LeftHip, LeftKnee, LeftAnkle),
            Joint::RightShoulder => (RightElbow, RightShoulder, RightHip),
            Joint::LeftShoulder => (LeftElbow, LeftShoulder, LeftHip),
        }
    }

    /// Position in [`Joint::ALL`]
    fn slot(self) -> usize {
        self as usize
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Joint::RightArm => "right arm",
            Joint::LeftArm => "left arm",
            Joint::RightKnee => "right knee",
            Joint::LeftKnee => "left knee",
            Joint::RightShoulder => "right shoulder",
            Joint::LeftShoulder => "left shoulder",
        }
    }
}

/// Angles in degrees (0 to 180) for every tracked joint of one landmark set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngleReport {
    angles: [f64; JOINT_COUNT],
}

impl JointAngleReport {
    /// Build a report by evaluating `angle_of` for every joint
    pub(crate) fn from_fn(mut angle_of: impl FnMut(Joint) -> f64) -> Self {
        let mut angles = [0.0; JOINT_COUNT];
        for joint in Joint::ALL {
            angles[joint.slot()] = angle_of(joint);
        }
        Self { angles }
    }

    pub fn angle(&self, joint: Joint) -> f64 {
        self.angles[joint.slot()]
    }

    /// (joint, degrees) pairs in report order
    pub fn iter(&self) -> impl Iterator<Item = (Joint, f64)> + '_ {
        Joint::ALL.iter().map(move |&joint| (joint, self.angle(joint)))
    }
}

impl Serialize for JointAngleReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl std::fmt::Display for JointAngleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "====== Degree of position ======")?;
        for (joint, degrees) in self.iter() {
            writeln!(f, "{}: {:.1}", joint.display_name(), degrees)?;
        }
        Ok(())
    }
}

/// A report tagged with the timestamp of the frame it came from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimestampedReport {
    pub timestamp_us: i64,
    pub angles: JointAngleReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_set() -> Vec<LandmarkPoint> {
        (0..LANDMARK_COUNT)
            .map(|i| LandmarkPoint::new(i as f32 / 40.0, 0.5, 0.9))
            .collect()
    }

    #[test]
    fn test_decode_valid_payload() {
        let payload = encode_payload(&full_set());
        let set = LandmarkSet::decode(&payload).unwrap();
        assert_eq!(set.points().len(), LANDMARK_COUNT);
        assert_eq!(set.landmark(PoseLandmark::RightWrist).x, 16.0 / 40.0);
        assert_eq!(set.to_string(), "Pose landmarks: 33");
    }

    #[test]
    fn test_decode_optional_fields() {
        let mut payload = String::from(r#"{"landmark":["#);
        for i in 0..LANDMARK_COUNT {
            if i > 0 {
                payload.push(',');
            }
            payload.push_str(r#"{"x":0.25,"y":0.75}"#);
        }
        payload.push_str("]}");

        let set = LandmarkSet::decode(payload.as_bytes()).unwrap();
        let point = set.get(0).unwrap();
        assert_eq!(point.visibility, 0.0);
        assert_eq!(point.presence, None);
    }

    #[test]
    fn test_decode_rejects_short_set() {
        let payload = encode_payload(&full_set()[..30]);
        assert_eq!(
            LandmarkSet::decode(&payload),
            Err(DecodeError::WrongCardinality {
                expected: LANDMARK_COUNT,
                actual: 30
            })
        );
    }

    #[test]
    fn test_decode_rejects_long_set() {
        let mut points = full_set();
        points.push(LandmarkPoint::default());
        assert!(matches!(
            LandmarkSet::from_points(points),
            Err(DecodeError::WrongCardinality { actual: 34, .. })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            LandmarkSet::decode(b"\x08\x01\x12garbage"),
            Err(DecodeError::Malformed(_))
        ));
        assert!(matches!(
            LandmarkSet::decode(br#"{"points": []}"#),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn test_joint_landmark_indices() {
        let indices = |joint: Joint| {
            let (a, v, b) = joint.landmarks();
            (a.index(), v.index(), b.index())
        };
        assert_eq!(indices(Joint::RightArm), (16, 14, 12));
        assert_eq!(indices(Joint::LeftArm), (15, 13, 11));
        assert_eq!(indices(Joint::RightKnee), (24, 26, 28));
        assert_eq!(indices(Joint::LeftKnee), (23, 25, 27));
        assert_eq!(indices(Joint::RightShoulder), (14, 12, 24));
        assert_eq!(indices(Joint::LeftShoulder), (13, 11, 23));
    }

    #[test]
    fn test_report_serializes_as_map() {
        let report = JointAngleReport::from_fn(|joint| joint.slot() as f64 * 10.0);
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["right_arm"], 0.0);
        assert_eq!(json["left_shoulder"], 50.0);
        assert_eq!(json.as_object().unwrap().len(), 6);
    }
}
