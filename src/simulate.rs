//! Synthetic GPS stream for a round, for demos and pipeline tests.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::course::{CourseLayout, RoundId, UserId};
use crate::geo::{self, Coordinate};
use crate::sample::{LocationSample, LocationUpdate};

const WALKING_SPEED_MPS: f64 = 1.3;
const SAMPLE_INTERVAL_SECS: i64 = 10;
/// Balls closer than this are putted. Full shots from outside it always
/// travel far and fast enough to be detected.
const PUTTING_RANGE_M: f64 = 25.0;
/// Putts roll slower than walking pace.
const PUTT_SECS: i64 = 15;
const MAX_FULL_SHOTS: u32 = 7;

/// What the simulated player actually did on one hole.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedHole {
    pub hole_number: u32,
    pub par: u32,
    pub full_shots: u32,
    pub putts: u32,
    pub finish: Coordinate,
}

impl SimulatedHole {
    pub fn strokes(&self) -> u32 {
        self.full_shots + self.putts
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedRound {
    pub updates: Vec<LocationUpdate>,
    pub holes: Vec<SimulatedHole>,
}

/// Generates a plausible round: address at the tee, fast ball-flight jumps
/// for full shots, stationary pauses, putting and walks between holes.
pub struct RoundSimulator {
    rng: StdRng,
    user_id: UserId,
    round_id: RoundId,
    clock: DateTime<Utc>,
    updates: Vec<LocationUpdate>,
}

impl RoundSimulator {
    pub fn new(user_id: UserId, round_id: RoundId, start: DateTime<Utc>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            user_id,
            round_id,
            clock: start,
            updates: Vec::new(),
        }
    }

    /// Play every hole that has both anchors, in order.
    pub fn play(mut self, course: &CourseLayout) -> SimulatedRound {
        let mut holes = Vec::new();
        let mut position: Option<Coordinate> = None;

        for hole in course.holes() {
            let (Some(tee), Some(pin)) = (hole.tee, hole.pin) else {
                log::debug!("[SIMULATE] Skipping hole {} without anchors", hole.hole_number);
                continue;
            };

            if let Some(from) = position {
                self.walk(from, tee);
            }

            let (full_shots, putts, finish) = self.play_hole(tee, pin);
            log::debug!(
                "[SIMULATE] Hole {}: {} full shots, {} putts",
                hole.hole_number,
                full_shots,
                putts
            );
            holes.push(SimulatedHole {
                hole_number: hole.hole_number,
                par: hole.par,
                full_shots,
                putts,
                finish,
            });
            position = Some(finish);
        }

        SimulatedRound {
            updates: self.updates,
            holes,
        }
    }

    fn play_hole(&mut self, tee: Coordinate, pin: Coordinate) -> (u32, u32, Coordinate) {
        let mut ball = tee;
        self.stand(ball, 3);

        let mut full_shots = 0;
        while geo::distance(ball, pin) > PUTTING_RANGE_M && full_shots < MAX_FULL_SHOTS {
            let remaining = geo::distance(ball, pin);
            let carry = if remaining > 230.0 {
                self.rng.gen_range(200.0..260.0)
            } else {
                remaining * self.rng.gen_range(0.9..0.99)
            };
            let bearing = geo::bearing(ball, pin) + self.rng.gen_range(-4.0..4.0);
            let landing = ball.destination(bearing, carry);

            let flight_secs = self.rng.gen_range(5..10);
            self.advance(flight_secs);
            self.emit(landing, Some(carry / flight_secs as f64));
            full_shots += 1;

            ball = landing;
            self.stand(ball, 2);
        }

        // Lag putt when outside tap-in range, then hole out.
        let mut putts = 0;
        if geo::distance(ball, pin) > 2.0 {
            let lag = pin.destination(self.rng.gen_range(0.0..360.0), self.rng.gen_range(0.5..1.5));
            self.advance(PUTT_SECS);
            self.emit(lag, Some(0.4));
            putts += 1;
            ball = lag;
        }
        self.advance(PUTT_SECS);
        self.emit(ball, Some(0.0));
        putts += 1;

        (full_shots, putts, ball)
    }

    /// Stationary samples with a little GPS noise.
    fn stand(&mut self, at: Coordinate, samples: u32) {
        for _ in 0..samples {
            self.advance(SAMPLE_INTERVAL_SECS);
            let noisy = at.destination(self.rng.gen_range(0.0..360.0), self.rng.gen_range(0.0..1.0));
            self.emit(noisy, Some(0.0));
        }
    }

    fn walk(&mut self, from: Coordinate, to: Coordinate) {
        let total = geo::distance(from, to);
        let bearing = geo::bearing(from, to);
        let step = WALKING_SPEED_MPS * SAMPLE_INTERVAL_SECS as f64;
        let mut covered = 0.0;
        while covered + step < total {
            covered += step;
            self.advance(SAMPLE_INTERVAL_SECS);
            self.emit(from.destination(bearing, covered), Some(WALKING_SPEED_MPS));
        }
        self.advance(SAMPLE_INTERVAL_SECS);
        self.emit(to, Some(WALKING_SPEED_MPS));
    }

    fn advance(&mut self, secs: i64) {
        self.clock += Duration::seconds(secs);
    }

    fn emit(&mut self, coordinate: Coordinate, speed: Option<f64>) {
        let accuracy = self.rng.gen_range(3.0..8.0);
        self.updates.push(LocationUpdate {
            user_id: self.user_id,
            round_id: self.round_id,
            sample: LocationSample {
                coordinate,
                accuracy,
                speed,
                timestamp: self.clock,
            },
        });
    }
}
