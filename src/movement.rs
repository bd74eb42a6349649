use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::config::MovementConfig;
use crate::geo::{self, Coordinate};
use crate::shot::{ClubType, ShotEvent};

/// One observation kept in a round's movement window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowEntry {
    pub coordinate: Coordinate,
    /// Device-reported speed in m/s, if any.
    pub speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Time-bounded, ordered buffer of recent samples for one (user, round).
///
/// Entries age out by timestamp relative to the newest entry, not by count.
#[derive(Debug, Clone)]
pub struct MovementWindow {
    entries: VecDeque<WindowEntry>,
    retention: Duration,
}

impl MovementWindow {
    pub fn new(retention_secs: i64) -> Self {
        Self {
            entries: VecDeque::new(),
            retention: Duration::seconds(retention_secs),
        }
    }

    /// Append `entry` if it is newer than every entry held. Returns false,
    /// leaving the window untouched, for late or repeated samples.
    pub fn push(&mut self, entry: WindowEntry) -> bool {
        if self
            .latest()
            .is_some_and(|latest| entry.timestamp <= latest.timestamp)
        {
            return false;
        }
        self.entries.push_back(entry);
        let cutoff = entry.timestamp - self.retention;
        while self
            .entries
            .front()
            .is_some_and(|oldest| oldest.timestamp < cutoff)
        {
            self.entries.pop_front();
        }
        true
    }

    pub fn latest(&self) -> Option<&WindowEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Result of comparing a sample with its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub enum MovementOutcome {
    /// No predecessor inside the analysis window.
    InsufficientHistory,
    /// Not newer than the latest sample in the window; ignored.
    OutOfOrder { latest: DateTime<Utc> },
    /// Movement that does not look like a ball in flight.
    Walking {
        distance_m: f64,
        duration_secs: f64,
        speed_mps: f64,
    },
    Shot(ShotEvent),
}

impl MovementOutcome {
    pub fn shot(&self) -> Option<&ShotEvent> {
        match self {
            MovementOutcome::Shot(shot) => Some(shot),
            _ => None,
        }
    }

    pub fn is_out_of_order(&self) -> bool {
        matches!(self, MovementOutcome::OutOfOrder { .. })
    }
}

/// Classifies the transition between consecutive samples as a shot or as
/// walking. Pure computation over a window owned by the caller's session.
#[derive(Debug, Clone, Default)]
pub struct MovementAnalyzer {
    config: MovementConfig,
}

impl MovementAnalyzer {
    pub fn new(config: MovementConfig) -> Self {
        Self { config }
    }

    pub fn new_window(&self) -> MovementWindow {
        MovementWindow::new(self.config.retention_secs)
    }

    /// Compare `entry` with the newest sample in `window`, then append it.
    /// Samples not newer than the window's latest are neither analyzed nor
    /// appended.
    pub fn observe(&self, window: &mut MovementWindow, entry: WindowEntry) -> MovementOutcome {
        let outcome = match window.latest() {
            Some(latest) if entry.timestamp <= latest.timestamp => {
                log::debug!(
                    "[MOVEMENT] Sample at {} is not newer than {}, ignored",
                    entry.timestamp,
                    latest.timestamp
                );
                return MovementOutcome::OutOfOrder {
                    latest: latest.timestamp,
                };
            }
            Some(prior) if self.in_analysis_window(prior, &entry) => self.classify(prior, &entry),
            Some(_) => {
                log::debug!("[MOVEMENT] Previous sample is outside the analysis window");
                MovementOutcome::InsufficientHistory
            }
            None => MovementOutcome::InsufficientHistory,
        };
        window.push(entry);
        outcome
    }

    fn in_analysis_window(&self, prior: &WindowEntry, entry: &WindowEntry) -> bool {
        entry.timestamp - prior.timestamp <= Duration::seconds(self.config.analysis_window_secs)
    }

    fn classify(&self, prior: &WindowEntry, entry: &WindowEntry) -> MovementOutcome {
        let distance_m = geo::distance(prior.coordinate, entry.coordinate);
        let duration_secs = (entry.timestamp - prior.timestamp).num_milliseconds() as f64 / 1000.0;
        let speed_mps = if duration_secs > 0.0 {
            distance_m / duration_secs
        } else {
            0.0
        };
        // A missing device speed is treated as stationary.
        let prior_speed = prior.speed.unwrap_or(0.0);
        let ceiling = self.config.walking_speed_ceiling_mps;

        let is_shot = distance_m >= self.config.min_shot_distance_m
            && duration_secs > 0.0
            && duration_secs <= self.config.max_shot_window_secs
            && speed_mps > ceiling
            && prior_speed <= ceiling;

        if !is_shot {
            log::debug!(
                "[MOVEMENT] {:.0}m in {:.1}s ({:.1} m/s), likely walking",
                distance_m,
                duration_secs,
                speed_mps
            );
            return MovementOutcome::Walking {
                distance_m,
                duration_secs,
                speed_mps,
            };
        }

        let confidence = self.shot_confidence(distance_m, duration_secs, speed_mps);
        let club = ClubType::for_distance(distance_m);

        log::info!(
            "[SHOT] {:.0}m in {:.1}s ({:.1} m/s), club={}, confidence={:.2}",
            distance_m,
            duration_secs,
            speed_mps,
            club.label(),
            confidence
        );

        MovementOutcome::Shot(ShotEvent {
            distance_m,
            duration_secs,
            club,
            confidence,
            from: prior.coordinate,
            to: entry.coordinate,
            timestamp: entry.timestamp,
        })
    }

    /// Heuristic confidence in tenths: long, fast transitions score higher,
    /// near-instant ones are likely GPS jitter.
    fn shot_confidence(&self, distance_m: f64, duration_secs: f64, speed_mps: f64) -> f64 {
        let mut tenths: i32 = 5;
        if distance_m > 100.0 {
            tenths += 2;
        }
        if distance_m > 200.0 {
            tenths += 2;
        }
        if speed_mps > 10.0 {
            tenths += 1;
        }
        if speed_mps > 20.0 {
            tenths += 1;
        }
        if duration_secs < self.config.jitter_window_secs {
            tenths -= 2;
        }
        f64::from(tenths.clamp(1, 10)) / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin() -> Coordinate {
        Coordinate::new(36.5674, -121.9500).unwrap()
    }

    fn at(coordinate: Coordinate, speed: Option<f64>, secs: i64) -> WindowEntry {
        let base = DateTime::parse_from_rfc3339("2026-05-01T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        WindowEntry {
            coordinate,
            speed,
            timestamp: base + Duration::seconds(secs),
        }
    }

    fn observe_pair(first: WindowEntry, second: WindowEntry) -> MovementOutcome {
        let analyzer = MovementAnalyzer::default();
        let mut window = analyzer.new_window();
        assert_eq!(
            analyzer.observe(&mut window, first),
            MovementOutcome::InsufficientHistory
        );
        analyzer.observe(&mut window, second)
    }

    #[test]
    fn slow_to_fast_transition_is_a_shot() {
        let outcome = observe_pair(
            at(origin(), Some(0.5), 0),
            at(origin().destination(0.0, 200.0), Some(20.0), 10),
        );
        let shot = outcome.shot().expect("shot expected");
        assert!(shot.confidence >= 0.8, "confidence {}", shot.confidence);
        assert!((shot.distance_m - 200.0).abs() < 0.01);
        assert_eq!(shot.duration_secs, 10.0);
    }

    #[test]
    fn long_elapsed_time_is_never_a_shot() {
        let outcome = observe_pair(
            at(origin(), Some(0.5), 0),
            at(origin().destination(0.0, 200.0), Some(3.3), 60),
        );
        assert!(matches!(outcome, MovementOutcome::Walking { .. }));
    }

    #[test]
    fn sustained_fast_movement_is_not_a_shot() {
        // Riding a cart: the previous sample was already fast.
        let outcome = observe_pair(
            at(origin(), Some(6.0), 0),
            at(origin().destination(0.0, 100.0), Some(6.0), 15),
        );
        assert!(outcome.shot().is_none());
    }

    #[test]
    fn short_displacement_is_walking() {
        let outcome = observe_pair(
            at(origin(), Some(0.0), 0),
            at(origin().destination(0.0, 15.0), Some(1.4), 5),
        );
        assert!(matches!(outcome, MovementOutcome::Walking { .. }));
    }

    #[test]
    fn jitter_penalty_lowers_confidence() {
        let outcome = observe_pair(
            at(origin(), None, 0),
            at(origin().destination(0.0, 40.0), None, 1),
        );
        let shot = outcome.shot().expect("shot expected");
        // 0.5 base, +0.1 and +0.1 for 40 m/s, -0.2 jitter
        assert!((shot.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn confidence_is_capped_at_one() {
        let outcome = observe_pair(
            at(origin(), Some(0.0), 0),
            at(origin().destination(0.0, 260.0), None, 8),
        );
        let shot = outcome.shot().expect("shot expected");
        assert_eq!(shot.confidence, 1.0);
        assert_eq!(shot.club, ClubType::Driver);
    }

    #[test]
    fn stale_predecessor_is_insufficient_history() {
        let outcome = observe_pair(
            at(origin(), Some(0.0), 0),
            at(origin().destination(0.0, 200.0), None, 301),
        );
        assert_eq!(outcome, MovementOutcome::InsufficientHistory);
    }

    #[test]
    fn repeated_sample_does_not_become_the_predecessor() {
        let analyzer = MovementAnalyzer::default();
        let mut window = analyzer.new_window();
        let tee = origin();
        let drive = origin().destination(0.0, 240.0);

        analyzer.observe(&mut window, at(tee, Some(0.0), 0));
        analyzer.observe(&mut window, at(tee, Some(0.0), 10));
        assert!(analyzer
            .observe(&mut window, at(drive, Some(24.0), 20))
            .shot()
            .is_some());

        let repeated = analyzer.observe(&mut window, at(tee, Some(0.0), 10));
        assert!(repeated.is_out_of_order());
        assert_eq!(window.len(), 3);
        assert_eq!(window.latest().map(|e| e.coordinate), Some(drive));

        let next = analyzer.observe(&mut window, at(drive, Some(0.0), 30));
        assert!(matches!(next, MovementOutcome::Walking { .. }));
    }

    #[test]
    fn same_timestamp_is_out_of_order() {
        let analyzer = MovementAnalyzer::default();
        let mut window = analyzer.new_window();
        analyzer.observe(&mut window, at(origin(), Some(0.0), 10));
        let outcome = analyzer.observe(&mut window, at(origin().destination(0.0, 200.0), None, 10));
        assert!(outcome.is_out_of_order());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn window_ages_out_by_timestamp() {
        let mut window = MovementWindow::new(60);
        window.push(at(origin(), None, 0));
        window.push(at(origin(), None, 30));
        assert_eq!(window.len(), 2);
        window.push(at(origin(), None, 90));
        assert_eq!(window.len(), 2);
        window.push(at(origin(), None, 500));
        assert_eq!(window.len(), 1);
        assert!(!window.push(at(origin(), None, 400)));
        assert_eq!(window.len(), 1);
    }
}
