use serde::{Deserialize, Serialize};

use crate::config::CompletionConfig;
use crate::course::HoleLayout;
use crate::geo::{self, Coordinate};

pub const ACTION_CONFIRM: &str = "Confirm your score";
pub const ACTION_PUTT: &str = "Continue putting";
pub const ACTION_PLAY: &str = "Continue playing";
pub const ACTION_UNAVAILABLE: &str = "Unable to analyze hole completion";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoleCompletionAnalysis {
    pub hole_number: u32,
    pub distance_to_pin: Option<f64>,
    pub is_near_hole: bool,
    pub is_on_green: bool,
    pub completion_confidence: f64,
    pub recommended_action: String,
}

impl HoleCompletionAnalysis {
    /// Result for a hole that is missing or has no pin.
    pub fn unavailable(hole_number: u32) -> Self {
        Self {
            hole_number,
            distance_to_pin: None,
            is_near_hole: false,
            is_on_green: false,
            completion_confidence: 0.0,
            recommended_action: ACTION_UNAVAILABLE.to_string(),
        }
    }
}

/// Proximity-based completion check for a single location against one pin.
#[derive(Debug, Clone, Default)]
pub struct HoleCompletionAnalyzer {
    config: CompletionConfig,
}

impl HoleCompletionAnalyzer {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }

    pub fn analyze(&self, hole: &HoleLayout, location: Coordinate) -> HoleCompletionAnalysis {
        let Some(pin) = hole.pin else {
            log::debug!("[COMPLETION] Hole {} has no pin anchor", hole.hole_number);
            return HoleCompletionAnalysis::unavailable(hole.hole_number);
        };

        let distance = geo::distance(location, pin);
        let is_near_hole = distance <= self.config.completion_threshold_m;
        let is_on_green = distance <= self.config.green_threshold_m;

        let (confidence, action) = if is_near_hole {
            (0.9, ACTION_CONFIRM)
        } else if is_on_green {
            (0.6, ACTION_PUTT)
        } else {
            (0.2, ACTION_PLAY)
        };

        log::debug!(
            "[COMPLETION] Hole {}: {:.1}m from pin, near={}, green={}",
            hole.hole_number,
            distance,
            is_near_hole,
            is_on_green
        );

        HoleCompletionAnalysis {
            hole_number: hole.hole_number,
            distance_to_pin: Some(distance),
            is_near_hole,
            is_on_green,
            completion_confidence: confidence,
            recommended_action: action.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole_with_pin(pin: Option<Coordinate>) -> HoleLayout {
        HoleLayout {
            hole_number: 7,
            par: 3,
            tee: None,
            pin,
        }
    }

    fn pin() -> Coordinate {
        Coordinate::new(36.5674, -121.9500).unwrap()
    }

    #[test]
    fn near_hole_asks_for_confirmation() {
        let at = pin().destination(90.0, 3.0);
        let analysis = HoleCompletionAnalyzer::default().analyze(&hole_with_pin(Some(pin())), at);
        assert!(analysis.is_near_hole);
        assert!(analysis.is_on_green);
        assert_eq!(analysis.completion_confidence, 0.9);
        assert_eq!(analysis.recommended_action, ACTION_CONFIRM);
    }

    #[test]
    fn on_green_keeps_putting() {
        let at = pin().destination(90.0, 12.0);
        let analysis = HoleCompletionAnalyzer::default().analyze(&hole_with_pin(Some(pin())), at);
        assert!(!analysis.is_near_hole);
        assert!(analysis.is_on_green);
        assert_eq!(analysis.completion_confidence, 0.6);
        assert_eq!(analysis.recommended_action, ACTION_PUTT);
    }

    #[test]
    fn far_from_pin_keeps_playing() {
        let at = pin().destination(90.0, 140.0);
        let analysis = HoleCompletionAnalyzer::default().analyze(&hole_with_pin(Some(pin())), at);
        assert!(!analysis.is_on_green);
        assert_eq!(analysis.completion_confidence, 0.2);
        assert_eq!(analysis.recommended_action, ACTION_PLAY);
    }

    #[test]
    fn missing_pin_is_unavailable() {
        let analysis = HoleCompletionAnalyzer::default().analyze(&hole_with_pin(None), pin());
        assert_eq!(analysis, HoleCompletionAnalysis::unavailable(7));
        assert_eq!(analysis.completion_confidence, 0.0);
    }
}
