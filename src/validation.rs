use serde::{Deserialize, Serialize};

use crate::advice::AdviceService;
use crate::config::ScoringConfig;
use crate::course::{RoundId, UserId};
use crate::storage::RoundRepository;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreValidationResult {
    pub hole_number: u32,
    pub original_score: u32,
    pub final_score: i32,
    pub user_corrected: bool,
    pub validation_confidence: f64,
    pub validation_notes: Vec<String>,
    pub recording_successful: bool,
    pub commentary: Option<String>,
}

/// Reconciles a user-confirmed score with the detected one and records it.
///
/// Validation itself is stateless: the same inputs always yield the same
/// final score and confidence.
#[derive(Debug, Clone, Default)]
pub struct ScoreValidator {
    config: ScoringConfig,
}

impl ScoreValidator {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Pure reconciliation; nothing is written.
    pub fn validate(
        &self,
        hole_number: u32,
        detected_score: u32,
        user_score: Option<i32>,
    ) -> ScoreValidationResult {
        let detected = i32::try_from(detected_score).unwrap_or(i32::MAX);
        let final_score = user_score.unwrap_or(detected);
        let user_corrected = user_score.is_some_and(|s| s != detected);

        let mut notes = Vec::new();
        if user_corrected {
            notes.push(format!(
                "User corrected detected score from {} to {}",
                detected, final_score
            ));
        }

        let max = i32::try_from(self.config.max_reasonable_score).unwrap_or(i32::MAX);
        if final_score < 1 {
            notes.push("Score cannot be less than 1".to_string());
        } else if final_score > max {
            notes.push(format!("Score of {} is unusually high", final_score));
        } else {
            notes.push("Score is within reasonable range".to_string());
        }

        ScoreValidationResult {
            hole_number,
            original_score: detected_score,
            final_score,
            user_corrected,
            validation_confidence: validation_confidence(detected, final_score),
            validation_notes: notes,
            recording_successful: false,
            commentary: None,
        }
    }

    /// Validate, then commit the final score and fetch closing commentary.
    ///
    /// Never fails: repository errors land in the notes and leave
    /// `recording_successful` false.
    #[allow(clippy::too_many_arguments)]
    pub async fn validate_and_record(
        &self,
        rounds: &dyn RoundRepository,
        advice: &AdviceService,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        par: Option<u32>,
        detected_score: u32,
        user_score: Option<i32>,
    ) -> ScoreValidationResult {
        let mut result = self.validate(hole_number, detected_score, user_score);

        // Zero or negative would corrupt the scorecard; everything else is advisory.
        let Some(score) = u32::try_from(result.final_score).ok().filter(|s| *s > 0) else {
            result.validation_notes.push("Score not recorded".to_string());
            log::warn!(
                "[VALIDATION] Refusing to record score {} for round {} hole {}",
                result.final_score,
                round_id,
                hole_number
            );
            return result;
        };

        match rounds.update_hole_score(round_id, hole_number, score).await {
            Ok(()) => {
                result.recording_successful = true;
                log::info!(
                    "[VALIDATION] Recorded score {} for round {} hole {} (corrected={}, confidence={:.1})",
                    score,
                    round_id,
                    hole_number,
                    result.user_corrected,
                    result.validation_confidence
                );
            }
            Err(e) => {
                log::warn!(
                    "[VALIDATION] Failed to record score for round {} hole {}: {}",
                    round_id,
                    hole_number,
                    e
                );
                result
                    .validation_notes
                    .push(format!("Failed to record score: {}", e));
                return result;
            }
        }

        if let Some(par) = par {
            result.commentary = Some(
                advice
                    .hole_commentary(user_id, round_id, hole_number, score, par)
                    .await,
            );
        }
        result
    }
}

/// Confidence shrinks with the size of the user's correction.
pub fn validation_confidence(detected: i32, final_score: i32) -> f64 {
    match detected.abs_diff(final_score) {
        0 => 0.9,
        1 => 0.7,
        2 => 0.5,
        _ => 0.3,
    }
}
