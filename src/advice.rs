use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::time::timeout;

use crate::config::AdviceConfig;
use crate::course::{RoundId, UserId};
use crate::position::PositionOnHole;

/// What the advice service is told about the player after each sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationContext {
    pub hole_number: Option<u32>,
    pub position: PositionOnHole,
    pub distance_to_pin: Option<f64>,
    pub shot_detected: bool,
    pub shot_distance: Option<f64>,
}

/// Natural-language commentary source. Opaque to the scoring pipeline.
#[async_trait]
pub trait AdviceGenerator: Send + Sync {
    async fn generate_hole_completion_commentary(
        &self,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        score: u32,
        par: u32,
    ) -> Result<String>;

    async fn update_location_context(
        &self,
        _user_id: UserId,
        _round_id: RoundId,
        _context: &LocationContext,
    ) -> Result<()> {
        Ok(())
    }
}

/// Commentary that needs no collaborator, keyed on score relative to par.
pub fn fallback_commentary(score: u32, par: u32) -> String {
    let relative = i64::from(score) - i64::from(par);
    let phrase = match relative {
        -2 => "Eagle! Outstanding hole.",
        -1 => "Birdie! Great hole.",
        0 => "Par. Solid hole.",
        1 => "Bogey. Shake it off and go get the next one.",
        2 => "Double bogey. Reset on the next tee.",
        3.. => "Tough hole. Fresh start on the next one.",
        _ => "Remarkable hole. One for the scorecard.",
    };
    phrase.to_string()
}

/// Advice service reached over HTTP with JSON payloads.
pub struct HttpAdviceClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct CommentaryResponse {
    commentary: String,
}

impl HttpAdviceClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl AdviceGenerator for HttpAdviceClient {
    async fn generate_hole_completion_commentary(
        &self,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        score: u32,
        par: u32,
    ) -> Result<String> {
        let url = format!("{}/commentary/hole-completion", self.base_url);
        let payload = json!({
            "userId": user_id,
            "roundId": round_id,
            "holeNumber": hole_number,
            "score": score,
            "par": par,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()?;
        let body: CommentaryResponse = response
            .json()
            .await
            .context("Failed to decode commentary response")?;
        Ok(body.commentary)
    }

    async fn update_location_context(
        &self,
        user_id: UserId,
        round_id: RoundId,
        context: &LocationContext,
    ) -> Result<()> {
        let url = format!("{}/context/location", self.base_url);
        let payload = json!({
            "userId": user_id,
            "roundId": round_id,
            "context": context,
        });

        self.client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?
            .error_for_status()?;
        Ok(())
    }
}

/// Bounded, never-failing access to an optional [`AdviceGenerator`].
///
/// Every call is capped by the configured timeout and falls back to the
/// phrase table, so scoring never depends on the collaborator.
#[derive(Clone)]
pub struct AdviceService {
    generator: Option<Arc<dyn AdviceGenerator>>,
    timeout: Duration,
}

impl AdviceService {
    pub fn new(generator: Arc<dyn AdviceGenerator>, timeout: Duration) -> Self {
        Self {
            generator: Some(generator),
            timeout,
        }
    }

    /// Phrase-table commentary only.
    pub fn offline() -> Self {
        Self {
            generator: None,
            timeout: Duration::from_millis(AdviceConfig::default().timeout_ms),
        }
    }

    pub fn from_config(config: &AdviceConfig) -> Self {
        match config.base_url {
            Some(ref url) => {
                log::info!("[ADVICE] Using advice service at {}", url);
                Self::new(
                    Arc::new(HttpAdviceClient::new(url.clone())),
                    Duration::from_millis(config.timeout_ms),
                )
            }
            None => Self::offline(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    pub async fn hole_commentary(
        &self,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        score: u32,
        par: u32,
    ) -> String {
        let Some(ref generator) = self.generator else {
            return fallback_commentary(score, par);
        };

        let call = generator
            .generate_hole_completion_commentary(user_id, round_id, hole_number, score, par);
        match timeout(self.timeout, call).await {
            Ok(Ok(text)) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                log::debug!("[ADVICE] Empty commentary for hole {}, using fallback", hole_number);
                fallback_commentary(score, par)
            }
            Ok(Err(e)) => {
                log_failure("Commentary request failed", &e);
                fallback_commentary(score, par)
            }
            Err(_) => {
                log::warn!(
                    "[ADVICE] Commentary timed out after {}ms, using fallback",
                    self.timeout.as_millis()
                );
                fallback_commentary(score, par)
            }
        }
    }

    /// Best-effort context push; failures are logged and dropped.
    pub async fn forward_location_context(
        &self,
        user_id: UserId,
        round_id: RoundId,
        context: LocationContext,
    ) {
        let Some(ref generator) = self.generator else {
            return;
        };

        match timeout(
            self.timeout,
            generator.update_location_context(user_id, round_id, &context),
        )
        .await
        {
            Ok(Ok(())) => log::debug!("[ADVICE] Location context sent for round {}", round_id),
            Ok(Err(e)) => log_failure("Location context update failed", &e),
            Err(_) => log::warn!("[ADVICE] Location context update timed out"),
        }
    }
}

/// Connection failures mean the service is not running and are expected;
/// anything else is worth a warning.
fn log_failure(what: &str, err: &anyhow::Error) {
    let unreachable = err
        .downcast_ref::<reqwest::Error>()
        .is_some_and(|e| e.is_connect() || e.is_timeout());
    if unreachable {
        log::debug!("[ADVICE] {} (advice service may not be running): {:#}", what, err);
    } else {
        log::warn!("[ADVICE] {}: {:#}", what, err);
    }
}
