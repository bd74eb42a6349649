//! Per-round location processing and the scoring entry points.
//!
//! Each round in progress owns a [`RoundSession`]. Samples for one round are
//! serialized through the session's ordering gate; samples for different
//! rounds proceed independently. The state lock guarding the movement
//! window is only ever held for CPU work, never across an `.await`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::AbortHandle;

use crate::advice::{AdviceService, LocationContext};
use crate::completion::{HoleCompletionAnalysis, HoleCompletionAnalyzer};
use crate::config::TrackerConfig;
use crate::course::{CourseId, CourseLayout, HoleLayout, Round, RoundId, UserId};
use crate::geo::{meters_to_yards, Coordinate};
use crate::movement::{MovementAnalyzer, MovementOutcome, MovementWindow};
use crate::position::{PositionOnHole, PositionReading, PositionTracker};
use crate::sample::{LocationUpdate, TrackedLocation};
use crate::scoring::{AutoScoreResult, ScoreInferenceEngine};
use crate::shot::ShotEvent;
use crate::storage::{CourseRepository, LocationStore, RoundRepository};
use crate::validation::{ScoreValidationResult, ScoreValidator};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationProcessingResult {
    pub success: bool,
    pub user_id: UserId,
    pub round_id: RoundId,
    pub location_id: Option<u64>,
    pub hole_number: Option<u32>,
    pub position: PositionOnHole,
    pub distance_to_pin: Option<f64>,
    pub distance_to_tee: Option<f64>,
    pub within_boundaries: bool,
    pub shot: Option<ShotEvent>,
    pub messages: Vec<String>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl LocationProcessingResult {
    fn failed(update: &LocationUpdate, reason: String) -> Self {
        Self {
            success: false,
            user_id: update.user_id,
            round_id: update.round_id,
            location_id: None,
            hole_number: None,
            position: PositionOnHole::Unknown,
            distance_to_pin: None,
            distance_to_tee: None,
            within_boundaries: true,
            shot: None,
            messages: Vec::new(),
            error: Some(reason),
            timestamp: update.sample.timestamp,
        }
    }
}

struct SessionState {
    user_id: UserId,
    layout: Arc<CourseLayout>,
    window: MovementWindow,
    shots_by_hole: BTreeMap<u32, Vec<ShotEvent>>,
    current_hole: Option<u32>,
    pending: Vec<AbortHandle>,
}

impl SessionState {
    fn shots_for(&self, hole_number: u32) -> Vec<ShotEvent> {
        self.shots_by_hole
            .get(&hole_number)
            .cloned()
            .unwrap_or_default()
    }

    /// Attribute a shot to the hole it finished on, or the last hole seen.
    fn record_shot(&mut self, hole: Option<u32>, shot: ShotEvent) -> Option<u32> {
        let hole = hole.or(self.current_hole)?;
        self.shots_by_hole.entry(hole).or_default().push(shot);
        Some(hole)
    }
}

/// Tracking state for one (user, round).
struct RoundSession {
    gate: tokio::sync::Mutex<()>,
    state: Mutex<SessionState>,
    closed: AtomicBool,
}

impl RoundSession {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct RoundTracker {
    courses: Arc<dyn CourseRepository>,
    rounds: Arc<dyn RoundRepository>,
    locations: Arc<dyn LocationStore>,
    advice: AdviceService,
    position: PositionTracker,
    movement: MovementAnalyzer,
    completion: HoleCompletionAnalyzer,
    scoring: ScoreInferenceEngine,
    validator: ScoreValidator,
    retention: Duration,
    sessions: Mutex<HashMap<RoundId, Arc<RoundSession>>>,
    layouts: RwLock<HashMap<CourseId, Arc<CourseLayout>>>,
}

impl RoundTracker {
    pub fn new(
        config: &TrackerConfig,
        courses: Arc<dyn CourseRepository>,
        rounds: Arc<dyn RoundRepository>,
        locations: Arc<dyn LocationStore>,
        advice: AdviceService,
    ) -> Self {
        Self {
            courses,
            rounds,
            locations,
            advice,
            position: PositionTracker::new(config.position.clone()),
            movement: MovementAnalyzer::new(config.movement.clone()),
            completion: HoleCompletionAnalyzer::new(config.completion.clone()),
            scoring: ScoreInferenceEngine::new(config.scoring.clone()),
            validator: ScoreValidator::new(config.scoring.clone()),
            retention: Duration::seconds(config.movement.retention_secs),
            sessions: Mutex::new(HashMap::new()),
            layouts: RwLock::new(HashMap::new()),
        }
    }

    /// Enrich, analyze and persist one sample.
    pub async fn process_location_update(
        &self,
        update: LocationUpdate,
    ) -> LocationProcessingResult {
        let session = match self.session_for(&update).await {
            Ok(session) => session,
            Err(reason) => {
                log::warn!("[TRACKER] Rejected sample for round {}: {}", update.round_id, reason);
                return LocationProcessingResult::failed(&update, reason);
            }
        };

        let _order = session.gate.lock().await;
        if session.closed.load(Ordering::Acquire) {
            return LocationProcessingResult::failed(
                &update,
                format!("Round {} has ended", update.round_id),
            );
        }

        // The live ledger counts a detected shot even if persisting the
        // sample fails below; the result then carries the storage error.
        let (reading, outcome, shot_hole) = {
            let mut state = session.state();
            let reading = self.position.read(&state.layout, update.sample.coordinate);
            let window_entry = update.sample.window_entry();
            let outcome = self.movement.observe(&mut state.window, window_entry);
            let shot_hole = match outcome {
                MovementOutcome::Shot(ref shot) => {
                    state.record_shot(reading.hole_number, shot.clone())
                }
                _ => None,
            };
            if reading.hole_number.is_some() && !outcome.is_out_of_order() {
                state.current_hole = reading.hole_number;
            }
            (reading, outcome, shot_hole)
        };

        if let MovementOutcome::OutOfOrder { latest } = outcome {
            log::debug!(
                "[TRACKER] Ignoring late sample for round {} ({} <= {})",
                update.round_id,
                update.sample.timestamp,
                latest
            );
            return LocationProcessingResult {
                success: true,
                user_id: update.user_id,
                round_id: update.round_id,
                location_id: None,
                hole_number: reading.hole_number,
                position: reading.position,
                distance_to_pin: reading.distance_to_pin,
                distance_to_tee: reading.distance_to_tee,
                within_boundaries: reading.within_boundaries,
                shot: None,
                messages: vec![format!(
                    "Sample is not newer than the last one ({}), ignored",
                    latest.format("%H:%M:%S")
                )],
                error: None,
                timestamp: update.sample.timestamp,
            };
        }

        let shot = outcome.shot().cloned();
        let mut messages = describe(&reading, shot.as_ref(), shot_hole);

        let tracked = TrackedLocation {
            id: None,
            user_id: update.user_id,
            round_id: update.round_id,
            sample: update.sample,
            reading: reading.clone(),
            shot: shot.clone(),
        };
        let (location_id, error) = match self.locations.create(tracked).await {
            Ok(stored) => (stored.id, None),
            Err(e) => {
                log::warn!("[TRACKER] Failed to store sample for round {}: {}", update.round_id, e);
                if shot.is_some() {
                    messages.push("Shot counted for this session but not stored".to_string());
                }
                (None, Some(format!("Failed to store location: {}", e)))
            }
        };

        self.forward_context(&session, &update, &reading, shot.as_ref());

        LocationProcessingResult {
            success: error.is_none(),
            user_id: update.user_id,
            round_id: update.round_id,
            location_id,
            hole_number: reading.hole_number,
            position: reading.position,
            distance_to_pin: reading.distance_to_pin,
            distance_to_tee: reading.distance_to_tee,
            within_boundaries: reading.within_boundaries,
            shot,
            messages,
            error,
            timestamp: update.sample.timestamp,
        }
    }

    /// Proximity check of `location` against the pin of `hole_number`.
    pub async fn analyze_hole_completion(
        &self,
        round_id: RoundId,
        hole_number: u32,
        location: Coordinate,
    ) -> HoleCompletionAnalysis {
        match self.lookup_hole(round_id, hole_number).await {
            Ok((_, hole)) => self.completion.analyze(&hole, location),
            Err(reason) => {
                log::debug!("[COMPLETION] {}", reason);
                HoleCompletionAnalysis::unavailable(hole_number)
            }
        }
    }

    /// Decide whether `hole_number` is finished and what the likely score is.
    pub async fn process_hole_completion(
        &self,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        location: Coordinate,
    ) -> AutoScoreResult {
        let (round, hole) = match self.lookup_hole(round_id, hole_number).await {
            Ok(found) => found,
            Err(reason) => {
                log::warn!("[SCORING] {}", reason);
                return AutoScoreResult::unavailable(hole_number, reason);
            }
        };
        if round.user_id != user_id {
            return AutoScoreResult::unavailable(
                hole_number,
                format!("Round {} does not belong to user {}", round_id, user_id),
            );
        }

        // After a restart the ledger only exists in the store.
        let session = match self.existing_session(round_id) {
            Some(session) => session,
            None => self.open_session(&round, DateTime::<Utc>::MIN_UTC).await,
        };
        let shots = session.state().shots_for(hole_number);

        let analysis = self.completion.analyze(&hole, location);
        let inference = self.scoring.infer(&shots, &analysis, hole.par);

        let commentary = if self.scoring.wants_commentary(&inference) {
            Some(
                self.advice
                    .hole_commentary(
                        user_id,
                        round_id,
                        hole_number,
                        inference.detected_score,
                        hole.par,
                    )
                    .await,
            )
        } else {
            None
        };

        AutoScoreResult {
            hole_number,
            hole_completed: inference.hole_completed,
            detected_score: Some(inference.detected_score),
            par: Some(hole.par),
            distance_to_hole: analysis.distance_to_pin,
            shots: inference.shot_summaries,
            detection_confidence: inference.confidence,
            requires_confirmation: inference.requires_confirmation,
            detection_reasons: inference.reasons,
            commentary,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Reconcile and record the final score for a hole.
    pub async fn validate_and_record_score(
        &self,
        user_id: UserId,
        round_id: RoundId,
        hole_number: u32,
        detected_score: u32,
        user_score: Option<i32>,
    ) -> ScoreValidationResult {
        let par = match self.lookup_hole(round_id, hole_number).await {
            Ok((_, hole)) => Some(hole.par),
            Err(reason) => {
                log::debug!("[VALIDATION] No par for commentary: {}", reason);
                None
            }
        };

        self.validator
            .validate_and_record(
                self.rounds.as_ref(),
                &self.advice,
                user_id,
                round_id,
                hole_number,
                par,
                detected_score,
                user_score,
            )
            .await
    }

    /// Drop a round's session and cancel its outstanding background work.
    pub fn end_round(&self, round_id: RoundId) -> bool {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&round_id);

        let Some(session) = removed else {
            return false;
        };
        session.closed.store(true, Ordering::Release);
        let mut state = session.state();
        for task in state.pending.drain(..) {
            task.abort();
        }
        state.window.clear();
        state.shots_by_hole.clear();
        log::info!("[TRACKER] Round {} ended, session discarded", round_id);
        true
    }

    pub fn active_rounds(&self) -> Vec<RoundId> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<RoundId> = sessions.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Shots attributed to `hole_number` so far in this session.
    pub fn shots_for_hole(&self, round_id: RoundId, hole_number: u32) -> Vec<ShotEvent> {
        let Some(session) = self.existing_session(round_id) else {
            return Vec::new();
        };
        let shots = session.state().shots_for(hole_number);
        shots
    }

    fn existing_session(&self, round_id: RoundId) -> Option<Arc<RoundSession>> {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&round_id)
            .cloned()
    }

    async fn session_for(&self, update: &LocationUpdate) -> Result<Arc<RoundSession>, String> {
        if let Some(session) = self.existing_session(update.round_id) {
            let owner = session.state().user_id;
            if owner != update.user_id {
                return Err(format!(
                    "Round {} does not belong to user {}",
                    update.round_id, update.user_id
                ));
            }
            return Ok(session);
        }

        let round = self.find_round(update.round_id).await?;
        if round.user_id != update.user_id {
            return Err(format!(
                "Round {} does not belong to user {}",
                round.id, update.user_id
            ));
        }
        Ok(self
            .open_session(&round, update.sample.timestamp - self.retention)
            .await)
    }

    /// Register a session for `round`, seeded from samples stored since
    /// `cutoff`. A session registered concurrently wins.
    async fn open_session(&self, round: &Round, cutoff: DateTime<Utc>) -> Arc<RoundSession> {
        let layout = self.course_layout(round.course_id).await;
        let state = self.resume_state(round, layout, cutoff).await;

        let session = Arc::new(RoundSession {
            gate: tokio::sync::Mutex::new(()),
            state: Mutex::new(state),
            closed: AtomicBool::new(false),
        });
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(round.id).or_insert(session).clone()
    }

    /// Fresh session state, seeded from samples already stored for the round.
    async fn resume_state(
        &self,
        round: &Round,
        layout: Arc<CourseLayout>,
        cutoff: DateTime<Utc>,
    ) -> SessionState {
        let mut state = SessionState {
            user_id: round.user_id,
            layout,
            window: self.movement.new_window(),
            shots_by_hole: BTreeMap::new(),
            current_hole: None,
            pending: Vec::new(),
        };

        let history = match self.locations.get_since(round.id, cutoff).await {
            Ok(history) => history,
            Err(e) => {
                log::warn!("[TRACKER] Could not replay history for round {}: {}", round.id, e);
                return state;
            }
        };

        for past in &history {
            if !state.window.push(past.sample.window_entry()) {
                continue;
            }
            if let Some(ref shot) = past.shot {
                state.record_shot(past.reading.hole_number, shot.clone());
            }
            if past.reading.hole_number.is_some() {
                state.current_hole = past.reading.hole_number;
            }
        }
        if !history.is_empty() {
            log::info!(
                "[TRACKER] Resumed round {} with {} stored samples",
                round.id,
                history.len()
            );
        }
        state
    }

    async fn find_round(&self, round_id: RoundId) -> Result<Round, String> {
        match self.rounds.get_by_id(round_id).await {
            Ok(Some(round)) => Ok(round),
            Ok(None) => Err(format!("Round {} not found", round_id)),
            Err(e) => Err(format!("Failed to load round {}: {}", round_id, e)),
        }
    }

    async fn lookup_hole(
        &self,
        round_id: RoundId,
        hole_number: u32,
    ) -> Result<(Round, HoleLayout), String> {
        let round = self.find_round(round_id).await?;
        match self.courses.get_hole_by_number(round.course_id, hole_number).await {
            Ok(Some(hole)) => Ok((round, hole)),
            Ok(None) => Err(format!(
                "Hole {} not found on course {}",
                hole_number, round.course_id
            )),
            Err(e) => Err(format!("Failed to load hole {}: {}", hole_number, e)),
        }
    }

    /// Cached layout for a course. An unavailable course yields an empty
    /// layout (not cached), which degrades position readings to unknown.
    async fn course_layout(&self, course_id: CourseId) -> Arc<CourseLayout> {
        let cached = self
            .layouts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&course_id)
            .cloned();
        if let Some(layout) = cached {
            return layout;
        }

        match self.courses.get_holes_by_course(course_id).await {
            Ok(holes) => {
                let layout = Arc::new(CourseLayout::new(course_id, holes));
                log::debug!(
                    "[TRACKER] Loaded course {} with {} holes",
                    course_id,
                    layout.holes().len()
                );
                self.layouts
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .entry(course_id)
                    .or_insert(layout)
                    .clone()
            }
            Err(e) => {
                log::warn!("[TRACKER] Course {} unavailable: {}", course_id, e);
                Arc::new(CourseLayout::new(course_id, Vec::new()))
            }
        }
    }

    /// Push the latest context to the advice service without waiting on it.
    fn forward_context(
        &self,
        session: &RoundSession,
        update: &LocationUpdate,
        reading: &PositionReading,
        shot: Option<&ShotEvent>,
    ) {
        if !self.advice.is_enabled() {
            return;
        }

        let context = LocationContext {
            hole_number: reading.hole_number,
            position: reading.position,
            distance_to_pin: reading.distance_to_pin,
            shot_detected: shot.is_some(),
            shot_distance: shot.map(|s| s.distance_m),
        };
        let advice = self.advice.clone();
        let (user_id, round_id) = (update.user_id, update.round_id);
        let task = tokio::spawn(async move {
            advice.forward_location_context(user_id, round_id, context).await;
        });

        let mut state = session.state();
        state.pending.retain(|t| !t.is_finished());
        state.pending.push(task.abort_handle());
    }
}

fn describe(
    reading: &PositionReading,
    shot: Option<&ShotEvent>,
    shot_hole: Option<u32>,
) -> Vec<String> {
    let mut messages = Vec::new();

    match reading.hole_number {
        Some(hole) => messages.push(format!("On hole {} ({})", hole, reading.position.as_str())),
        None => messages.push("No hole detected nearby".to_string()),
    }
    if let Some(d) = reading.distance_to_pin {
        messages.push(format!("{:.0}m ({:.0} yds) to the pin", d, meters_to_yards(d)));
    }
    if !reading.within_boundaries {
        messages.push("Location is outside course boundaries".to_string());
    }
    if let Some(shot) = shot {
        messages.push(format!("Shot detected: ~{:.0}m", shot.distance_m));
        messages.push(format!("Estimated club: {}", shot.club.label()));
        if shot_hole.is_none() {
            messages.push("Shot could not be attributed to a hole".to_string());
        }
    }
    messages
}
