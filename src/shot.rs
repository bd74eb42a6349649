use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::{meters_to_yards, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClubType {
    Driver,
    Wood3,
    Wood5,
    Hybrid,
    Iron5,
    Iron6,
    Iron7,
    Iron8,
    Iron9,
    Pw,
    ShortIron,
}

impl ClubType {
    /// Club for a shot of `distance_m`, from a fixed bracket table.
    pub fn for_distance(distance_m: f64) -> Self {
        // (minimum carry in meters, club), longest first
        const BRACKETS: &[(f64, ClubType)] = &[
            (250.0, ClubType::Driver),
            (200.0, ClubType::Wood3),
            (180.0, ClubType::Wood5),
            (165.0, ClubType::Hybrid),
            (155.0, ClubType::Iron5),
            (145.0, ClubType::Iron6),
            (135.0, ClubType::Iron7),
            (120.0, ClubType::Iron8),
            (105.0, ClubType::Iron9),
            (50.0, ClubType::Pw),
        ];

        BRACKETS
            .iter()
            .find(|(min, _)| distance_m >= *min)
            .map(|(_, club)| *club)
            .unwrap_or(ClubType::ShortIron)
    }

    pub fn label(&self) -> &'static str {
        match self {
            ClubType::Driver => "Driver",
            ClubType::Wood3 => "3-Wood",
            ClubType::Wood5 => "5-Wood",
            ClubType::Hybrid => "Hybrid",
            ClubType::Iron5 => "5-Iron",
            ClubType::Iron6 => "6-Iron",
            ClubType::Iron7 => "7-Iron",
            ClubType::Iron8 => "8-Iron",
            ClubType::Iron9 => "9-Iron",
            ClubType::Pw => "Pitching Wedge",
            ClubType::ShortIron => "Short Iron",
        }
    }
}

/// A swing inferred from a slow-to-fast transition between two samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShotEvent {
    pub distance_m: f64,
    pub duration_secs: f64,
    pub club: ClubType,
    pub confidence: f64,
    pub from: Coordinate,
    pub to: Coordinate,
    pub timestamp: DateTime<Utc>,
}

impl ShotEvent {
    pub fn speed_mps(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.distance_m / self.duration_secs
        } else {
            0.0
        }
    }

    pub fn distance_yards(&self) -> f64 {
        meters_to_yards(self.distance_m)
    }

    /// One-line description, e.g. `~240m with Driver (90%)`.
    pub fn summary(&self) -> String {
        format!(
            "~{:.0}m with {} ({:.0}%)",
            self.distance_m,
            self.club.label(),
            self.confidence * 100.0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn club_brackets_are_ordered_by_distance() {
        assert_eq!(ClubType::for_distance(280.0), ClubType::Driver);
        assert_eq!(ClubType::for_distance(250.0), ClubType::Driver);
        assert_eq!(ClubType::for_distance(249.9), ClubType::Wood3);
        assert_eq!(ClubType::for_distance(150.0), ClubType::Iron6);
        assert_eq!(ClubType::for_distance(90.0), ClubType::Pw);
        assert_eq!(ClubType::for_distance(20.0), ClubType::ShortIron);
    }

    #[test]
    fn summary_mentions_distance_club_and_confidence() {
        let at = Coordinate::new(0.0, 0.0).unwrap();
        let shot = ShotEvent {
            distance_m: 240.0,
            duration_secs: 10.0,
            club: ClubType::Wood3,
            confidence: 0.9,
            from: at,
            to: at,
            timestamp: Utc::now(),
        };
        assert_eq!(shot.summary(), "~240m with 3-Wood (90%)");
        assert_eq!(shot.speed_mps(), 24.0);
    }
}
