use serde::{Deserialize, Serialize};

use crate::config::PositionConfig;
use crate::course::{CourseLayout, HoleLayout};
use crate::geo::{self, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionOnHole {
    Tee,
    Fairway,
    Green,
    Unknown,
}

impl PositionOnHole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tee => "tee",
            Self::Fairway => "fairway",
            Self::Green => "green",
            Self::Unknown => "unknown",
        }
    }
}

/// Where a sample sits on the course. Recomputed for every sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReading {
    pub hole_number: Option<u32>,
    pub distance_to_pin: Option<f64>,
    pub distance_to_tee: Option<f64>,
    pub position: PositionOnHole,
    pub within_boundaries: bool,
}

impl PositionReading {
    /// Reading used when the course cannot be consulted at all.
    pub fn unknown() -> Self {
        Self {
            hole_number: None,
            distance_to_pin: None,
            distance_to_tee: None,
            position: PositionOnHole::Unknown,
            within_boundaries: true,
        }
    }
}

/// Hole detection and position classification against a course layout.
///
/// Lookups that fail fall back to "no detection" rather than erroring; this
/// is context for the round, never a reason to drop a sample.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    config: PositionConfig,
}

impl PositionTracker {
    pub fn new(config: PositionConfig) -> Self {
        Self { config }
    }

    /// Full reading for `coord`: nearest hole, distances, classification and
    /// boundary check.
    pub fn read(&self, course: &CourseLayout, coord: Coordinate) -> PositionReading {
        let within_boundaries = self.within_course_boundaries(course, coord);
        let Some(hole_number) = self.detect_current_hole(course, coord) else {
            return PositionReading {
                within_boundaries,
                ..PositionReading::unknown()
            };
        };

        PositionReading {
            hole_number: Some(hole_number),
            distance_to_pin: self.distance_to_pin(course, hole_number, coord),
            distance_to_tee: self.distance_to_tee(course, hole_number, coord),
            position: self.position_on_hole(course, hole_number, coord),
            within_boundaries,
        }
    }

    /// Nearest hole by tee distance, or by pin distance when the pin is
    /// close enough to compete. Holes are scanned in order and the first
    /// minimum wins.
    pub fn detect_current_hole(&self, course: &CourseLayout, coord: Coordinate) -> Option<u32> {
        let mut best: Option<(u32, f64)> = None;

        for hole in course.holes() {
            let mut candidate = hole.tee.map(|tee| geo::distance(coord, tee));

            if let Some(pin) = hole.pin {
                let to_pin = geo::distance(coord, pin);
                if to_pin <= self.config.pin_detection_radius_m
                    && candidate.map_or(true, |to_tee| to_pin < to_tee)
                {
                    candidate = Some(to_pin);
                }
            }

            if let Some(d) = candidate {
                if best.map_or(true, |(_, best_d)| d < best_d) {
                    best = Some((hole.hole_number, d));
                }
            }
        }

        match best {
            Some((hole_number, d)) if d <= self.config.max_detection_radius_m => {
                log::debug!("[POSITION] Nearest hole {} at {:.0}m", hole_number, d);
                Some(hole_number)
            }
            Some((hole_number, d)) => {
                log::debug!(
                    "[POSITION] Nearest hole {} at {:.0}m is beyond {:.0}m, no detection",
                    hole_number,
                    d,
                    self.config.max_detection_radius_m
                );
                None
            }
            None => None,
        }
    }

    pub fn distance_to_pin(
        &self,
        course: &CourseLayout,
        hole_number: u32,
        coord: Coordinate,
    ) -> Option<f64> {
        let pin = course.hole(hole_number)?.pin?;
        Some(geo::distance(coord, pin))
    }

    pub fn distance_to_tee(
        &self,
        course: &CourseLayout,
        hole_number: u32,
        coord: Coordinate,
    ) -> Option<f64> {
        let tee = course.hole(hole_number)?.tee?;
        Some(geo::distance(coord, tee))
    }

    pub fn position_on_hole(
        &self,
        course: &CourseLayout,
        hole_number: u32,
        coord: Coordinate,
    ) -> PositionOnHole {
        match course.hole(hole_number) {
            Some(hole) => self.classify(hole, coord),
            None => PositionOnHole::Unknown,
        }
    }

    fn classify(&self, hole: &HoleLayout, coord: Coordinate) -> PositionOnHole {
        let to_tee = hole.tee.map(|tee| geo::distance(coord, tee));
        let to_pin = hole.pin.map(|pin| geo::distance(coord, pin));

        if to_tee.is_some_and(|d| d <= self.config.tee_radius_m) {
            return PositionOnHole::Tee;
        }
        if to_pin.is_some_and(|d| d <= self.config.green_radius_m || d < self.config.green_approach_m)
        {
            return PositionOnHole::Green;
        }
        match (to_tee, to_pin) {
            (Some(t), Some(p)) if t > self.config.tee_radius_m && p > self.config.green_radius_m => {
                PositionOnHole::Fairway
            }
            _ => PositionOnHole::Unknown,
        }
    }

    /// Coarse containment: within the boundary buffer of any tee or pin.
    /// An empty course cannot be checked and counts as inside.
    pub fn within_course_boundaries(&self, course: &CourseLayout, coord: Coordinate) -> bool {
        if course.is_empty() {
            return true;
        }

        let inside = course
            .holes()
            .iter()
            .flat_map(|hole| [hole.tee, hole.pin])
            .flatten()
            .any(|anchor| geo::distance(coord, anchor) <= self.config.boundary_buffer_m);

        if !inside {
            log::debug!("[POSITION] Sample outside course {} boundaries", course.course_id());
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Coordinate {
        Coordinate::new(36.5674, -121.9500).unwrap()
    }

    /// Two holes running north, 400m long, 1km apart east-west.
    fn course() -> CourseLayout {
        let tee1 = origin();
        let pin1 = tee1.destination(0.0, 400.0);
        let tee2 = tee1.destination(90.0, 1000.0);
        let pin2 = tee2.destination(0.0, 400.0);
        CourseLayout::new(
            1,
            vec![
                HoleLayout {
                    hole_number: 1,
                    par: 4,
                    tee: Some(tee1),
                    pin: Some(pin1),
                },
                HoleLayout {
                    hole_number: 2,
                    par: 4,
                    tee: Some(tee2),
                    pin: Some(pin2),
                },
            ],
        )
    }

    #[test]
    fn detects_hole_from_tee_proximity() {
        let tracker = PositionTracker::default();
        let coord = origin().destination(0.0, 10.0);
        assert_eq!(tracker.detect_current_hole(&course(), coord), Some(1));
    }

    #[test]
    fn pin_competes_only_when_close() {
        let tracker = PositionTracker::default();
        let course = course();
        // 30m short of hole 1's pin, 370m from its tee.
        let near_green = origin().destination(0.0, 370.0);
        assert_eq!(tracker.detect_current_hole(&course, near_green), Some(1));
        assert_eq!(tracker.position_on_hole(&course, 1, near_green), PositionOnHole::Green);
    }

    #[test]
    fn detection_radius_boundary() {
        let tracker = PositionTracker::default();
        let tee = origin();
        let single = CourseLayout::new(
            1,
            vec![HoleLayout {
                hole_number: 1,
                par: 3,
                tee: Some(tee),
                pin: Some(tee.destination(0.0, 150.0)),
            }],
        );

        // South of the tee, so the pin is even farther away.
        assert_eq!(tracker.detect_current_hole(&single, tee.destination(180.0, 499.0)), Some(1));
        assert_eq!(tracker.detect_current_hole(&single, tee.destination(180.0, 501.0)), None);
    }

    #[test]
    fn classifies_tee_fairway_green() {
        let tracker = PositionTracker::default();
        let course = course();
        assert_eq!(
            tracker.position_on_hole(&course, 1, origin().destination(0.0, 5.0)),
            PositionOnHole::Tee
        );
        assert_eq!(
            tracker.position_on_hole(&course, 1, origin().destination(0.0, 200.0)),
            PositionOnHole::Fairway
        );
        assert_eq!(
            tracker.position_on_hole(&course, 1, origin().destination(0.0, 390.0)),
            PositionOnHole::Green
        );
        assert_eq!(tracker.position_on_hole(&course, 9, origin()), PositionOnHole::Unknown);
    }

    #[test]
    fn missing_anchors_degrade_to_unknown() {
        let tracker = PositionTracker::default();
        let course = CourseLayout::new(
            1,
            vec![HoleLayout {
                hole_number: 1,
                par: 4,
                tee: Some(origin()),
                pin: None,
            }],
        );
        let coord = origin().destination(0.0, 200.0);
        assert_eq!(tracker.distance_to_pin(&course, 1, coord), None);
        assert_eq!(tracker.position_on_hole(&course, 1, coord), PositionOnHole::Unknown);
    }

    #[test]
    fn boundary_check_uses_buffer_around_anchors() {
        let tracker = PositionTracker::default();
        let course = course();
        assert!(tracker.within_course_boundaries(&course, origin().destination(270.0, 550.0)));
        assert!(!tracker.within_course_boundaries(&course, origin().destination(270.0, 650.0)));
        assert!(tracker.within_course_boundaries(&CourseLayout::new(1, vec![]), origin()));
    }

    #[test]
    fn read_without_detection_keeps_boundary_flag() {
        let tracker = PositionTracker::default();
        let reading = tracker.read(&course(), origin().destination(270.0, 5000.0));
        assert_eq!(reading.hole_number, None);
        assert_eq!(reading.position, PositionOnHole::Unknown);
        assert!(!reading.within_boundaries);
    }
}
