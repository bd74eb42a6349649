use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

pub type UserId = i64;
pub type RoundId = i64;
pub type CourseId = i64;

/// One hole's anchors and par. Immutable for the life of a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleLayout {
    pub hole_number: u32,
    pub par: u32,
    #[serde(default)]
    pub tee: Option<Coordinate>,
    #[serde(default)]
    pub pin: Option<Coordinate>,
}

/// A round in progress: who is playing which course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub id: RoundId,
    pub user_id: UserId,
    pub course_id: CourseId,
}

/// Read-only hole lookup for one course, ordered by hole number.
///
/// Built once per course from the course repository and shared between
/// sessions behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct CourseLayout {
    course_id: CourseId,
    holes: Vec<HoleLayout>,
}

impl CourseLayout {
    pub fn new(course_id: CourseId, mut holes: Vec<HoleLayout>) -> Self {
        holes.sort_by_key(|h| h.hole_number);
        holes.dedup_by_key(|h| h.hole_number);
        Self { course_id, holes }
    }

    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    pub fn holes(&self) -> &[HoleLayout] {
        &self.holes
    }

    pub fn hole(&self, hole_number: u32) -> Option<&HoleLayout> {
        self.holes
            .binary_search_by_key(&hole_number, |h| h.hole_number)
            .ok()
            .map(|idx| &self.holes[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.holes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole(n: u32) -> HoleLayout {
        HoleLayout {
            hole_number: n,
            par: 4,
            tee: None,
            pin: None,
        }
    }

    #[test]
    fn holes_are_sorted_and_looked_up_by_number() {
        let layout = CourseLayout::new(7, vec![hole(3), hole(1), hole(2)]);
        let numbers: Vec<u32> = layout.holes().iter().map(|h| h.hole_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(layout.hole(2).map(|h| h.hole_number), Some(2));
        assert!(layout.hole(4).is_none());
    }

    #[test]
    fn parses_camel_case_hole_json() {
        let json = r#"{"holeNumber": 1, "par": 4,
            "tee": {"latitude": 36.5, "longitude": -121.9},
            "pin": null}"#;
        let hole: HoleLayout = serde_json::from_str(json).unwrap();
        assert_eq!(hole.hole_number, 1);
        assert!(hole.tee.is_some());
        assert!(hole.pin.is_none());
    }
}
