use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::completion::HoleCompletionAnalysis;
use crate::config::ScoringConfig;
use crate::shot::ShotEvent;

/// Hole-completed recommendation handed to the application for confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoScoreResult {
    pub hole_number: u32,
    pub hole_completed: bool,
    /// Absent only when the hole could not be analyzed.
    pub detected_score: Option<u32>,
    pub par: Option<u32>,
    pub distance_to_hole: Option<f64>,
    pub shots: Vec<String>,
    pub detection_confidence: f64,
    pub requires_confirmation: bool,
    pub detection_reasons: Vec<String>,
    pub commentary: Option<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AutoScoreResult {
    /// Most conservative answer: nothing detected, user must confirm.
    pub fn unavailable(hole_number: u32, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            hole_number,
            hole_completed: false,
            detected_score: None,
            par: None,
            distance_to_hole: None,
            shots: Vec::new(),
            detection_confidence: 0.0,
            requires_confirmation: true,
            detection_reasons: vec![reason.clone()],
            commentary: None,
            error: Some(reason),
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of combining shot count and proximity for one hole.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreInference {
    pub hole_completed: bool,
    pub detected_score: u32,
    pub confidence: f64,
    pub requires_confirmation: bool,
    pub reasons: Vec<String>,
    pub shot_summaries: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreInferenceEngine {
    config: ScoringConfig,
}

impl ScoreInferenceEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn infer(
        &self,
        shots: &[ShotEvent],
        analysis: &HoleCompletionAnalysis,
        par: u32,
    ) -> ScoreInference {
        let mut reasons = Vec::new();
        let max = self.config.max_reasonable_score;

        if analysis.is_near_hole {
            reasons.push(format!(
                "Player is within {:.1}m of the pin",
                analysis.distance_to_pin.unwrap_or_default()
            ));
        } else if let Some(distance) = analysis.distance_to_pin {
            reasons.push(format!(
                "Player is {:.0}m from the pin, hole may not be finished",
                distance
            ));
        }

        let detected_score = if shots.is_empty() {
            reasons.push("No shot data recorded, using location analysis (par assumed)".to_string());
            par.clamp(1, max)
        } else {
            let count = u32::try_from(shots.len()).unwrap_or(u32::MAX);
            reasons.push(format!("Detected {} shot(s) from GPS movement", count));
            if count > max {
                reasons.push(format!("Shot count capped at {}", max));
            }
            count.min(max)
        };

        let mut tenths: u32 = 5;
        if analysis.is_near_hole {
            tenths += 3;
        }
        if !shots.is_empty() {
            tenths += 2;
        }
        let confidence = f64::from(tenths.min(10)) / 10.0;

        let requires_confirmation = self.requires_confirmation(confidence, detected_score, par);
        if par_deviation(detected_score, par) > self.config.max_par_deviation {
            reasons.push(format!(
                "Score of {} is more than {} from par {}, please confirm",
                detected_score, self.config.max_par_deviation, par
            ));
        }

        log::info!(
            "[SCORING] Hole {}: score={} par={} shots={} confidence={:.2} confirm={}",
            analysis.hole_number,
            detected_score,
            par,
            shots.len(),
            confidence,
            requires_confirmation
        );

        ScoreInference {
            hole_completed: analysis.is_near_hole,
            detected_score,
            confidence,
            requires_confirmation,
            reasons,
            shot_summaries: shots
                .iter()
                .enumerate()
                .map(|(i, shot)| format!("Shot {}: {}", i + 1, shot.summary()))
                .collect(),
        }
    }

    /// Low confidence or an implausible distance from par both need a human.
    pub fn requires_confirmation(&self, confidence: f64, detected_score: u32, par: u32) -> bool {
        confidence < self.config.high_confidence
            || par_deviation(detected_score, par) > self.config.max_par_deviation
    }

    /// Commentary is only worth requesting for a confident, completed hole.
    pub fn wants_commentary(&self, inference: &ScoreInference) -> bool {
        inference.hole_completed && inference.confidence >= self.config.medium_confidence
    }
}

fn par_deviation(score: u32, par: u32) -> u32 {
    score.abs_diff(par)
}
