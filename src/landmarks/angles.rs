// SPDX-License-Identifier: GPL-3.0-only

//! Joint angle calculation
//!
//! The angle at a joint is the difference of the two ray directions measured
//! with `atan2`, folded into 0..=180 degrees. Both functions are pure and can
//! be called from any thread.

use super::types::{JointAngleReport, LandmarkPoint, LandmarkSet};

/// Angle in degrees at `vertex` between the rays towards `a` and `b`
///
/// Always in 0..=180; the reflex angle is never returned. Swapping `a` and
/// `b` gives the same value.
pub fn angle(a: &LandmarkPoint, vertex: &LandmarkPoint, b: &LandmarkPoint) -> f64 {
    let to_b = (b.y as f64 - vertex.y as f64).atan2(b.x as f64 - vertex.x as f64);
    let to_a = (a.y as f64 - vertex.y as f64).atan2(a.x as f64 - vertex.x as f64);

    let degrees = (to_b - to_a).to_degrees().abs();
    if degrees > 180.0 {
        // Rounding can push a full turn a hair past 360
        (360.0 - degrees).max(0.0)
    } else {
        degrees
    }
}

/// Angles for every tracked joint of a landmark set
pub fn joint_angles(set: &LandmarkSet) -> JointAngleReport {
    JointAngleReport::from_fn(|joint| {
        let (a, vertex, b) = joint.landmarks();
        angle(set.landmark(a), set.landmark(vertex), set.landmark(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LANDMARK_COUNT;
    use crate::landmarks::types::{Joint, PoseLandmark};
    use proptest::prelude::*;

    fn point(x: f32, y: f32) -> LandmarkPoint {
        LandmarkPoint::new(x, y, 1.0)
    }

    fn approx(actual: f64, expected: f64) -> bool {
        (actual - expected).abs() < 1e-6
    }

    #[test]
    fn test_right_angle_scenario() {
        let degrees = angle(&point(0.0, 0.0), &point(1.0, 0.0), &point(1.0, 1.0));
        assert!(approx(degrees, 90.0), "got {}", degrees);
    }

    #[test]
    fn test_forty_five_degrees() {
        let degrees = angle(&point(1.0, 0.0), &point(0.0, 0.0), &point(1.0, 1.0));
        assert!(approx(degrees, 45.0), "got {}", degrees);
    }

    #[test]
    fn test_straight_line_is_180() {
        let degrees = angle(&point(1.0, 0.0), &point(0.0, 0.0), &point(-1.0, 0.0));
        assert!(approx(degrees, 180.0), "got {}", degrees);
    }

    #[test]
    fn test_same_point_is_zero() {
        let p = point(0.3, 0.8);
        assert!(approx(angle(&p, &point(0.5, 0.5), &p), 0.0));
    }

    #[test]
    fn test_reflex_angle_is_folded() {
        // Raw difference is 270 degrees, folded to 90
        let degrees = angle(&point(0.0, -1.0), &point(0.0, 0.0), &point(-1.0, 0.0));
        assert!(approx(degrees, 90.0), "got {}", degrees);
    }

    #[test]
    fn test_joint_angles_uses_joint_triples() {
        // Everything at the center except a bent right arm
        let mut points = vec![point(0.5, 0.5); LANDMARK_COUNT];
        points[PoseLandmark::RightShoulder.index()] = point(0.4, 0.3);
        points[PoseLandmark::RightElbow.index()] = point(0.4, 0.5);
        points[PoseLandmark::RightWrist.index()] = point(0.6, 0.5);
        let set = LandmarkSet::from_points(points).unwrap();

        let report = joint_angles(&set);
        assert!(approx(report.angle(Joint::RightArm), 90.0));
        assert_eq!(report.iter().count(), Joint::ALL.len());
    }

    proptest! {
        #[test]
        fn prop_angle_in_range(
            ax in -1.0f32..2.0, ay in -1.0f32..2.0,
            vx in -1.0f32..2.0, vy in -1.0f32..2.0,
            bx in -1.0f32..2.0, by in -1.0f32..2.0,
        ) {
            let degrees = angle(&point(ax, ay), &point(vx, vy), &point(bx, by));
            prop_assert!((0.0..=180.0).contains(&degrees), "out of range: {}", degrees);
        }

        #[test]
        fn prop_angle_is_symmetric(
            ax in 0.0f32..1.0, ay in 0.0f32..1.0,
            vx in 0.0f32..1.0, vy in 0.0f32..1.0,
            bx in 0.0f32..1.0, by in 0.0f32..1.0,
        ) {
            let a = point(ax, ay);
            let v = point(vx, vy);
            let b = point(bx, by);
            prop_assert!((angle(&a, &v, &b) - angle(&b, &v, &a)).abs() < 1e-9);
        }
    }
}
