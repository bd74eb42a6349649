#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use autoscore::advice::AdviceService;
use autoscore::storage::MemoryStore;
use autoscore::{
    Coordinate, CourseId, CourseLayout, HoleLayout, LocationSample, LocationUpdate, Round,
    RoundId, RoundTracker, TrackerConfig, UserId,
};

pub const COURSE_ID: CourseId = 1;

/// Par 4 of 362m running due north, then a par 3 of 160m whose tee is far
/// enough east that fairway positions on hole 1 never resolve to hole 2.
pub fn test_holes() -> Vec<HoleLayout> {
    let tee1 = tee();
    let pin1 = tee1.destination(0.0, 362.0);
    let tee2 = pin1.destination(90.0, 400.0);
    let pin2 = tee2.destination(180.0, 160.0);
    vec![
        HoleLayout {
            hole_number: 1,
            par: 4,
            tee: Some(tee1),
            pin: Some(pin1),
        },
        HoleLayout {
            hole_number: 2,
            par: 3,
            tee: Some(tee2),
            pin: Some(pin2),
        },
    ]
}

pub fn test_layout() -> CourseLayout {
    CourseLayout::new(COURSE_ID, test_holes())
}

pub fn tee() -> Coordinate {
    Coordinate::new(36.5674, -121.9500).expect("valid tee coordinate")
}

pub fn pin() -> Coordinate {
    tee().destination(0.0, 362.0)
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 14, 0, 0).unwrap()
}

/// Store seeded with the test course and one round per `(round, user)`.
pub fn seeded_store(rounds: &[(RoundId, UserId)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .insert_course(COURSE_ID, test_holes())
        .expect("insert course");
    for &(id, user_id) in rounds {
        store
            .insert_round(Round {
                id,
                user_id,
                course_id: COURSE_ID,
            })
            .expect("insert round");
    }
    store
}

pub fn tracker(store: &Arc<MemoryStore>, advice: AdviceService) -> RoundTracker {
    RoundTracker::new(
        &TrackerConfig::default(),
        store.clone(),
        store.clone(),
        store.clone(),
        advice,
    )
}

pub fn update(
    user_id: UserId,
    round_id: RoundId,
    coordinate: Coordinate,
    speed: Option<f64>,
    at_secs: i64,
) -> LocationUpdate {
    LocationUpdate {
        user_id,
        round_id,
        sample: LocationSample {
            coordinate,
            accuracy: 4.0,
            speed,
            timestamp: start() + Duration::seconds(at_secs),
        },
    }
}

/// Hole 1 played as drive (240m), approach (90m) and pitch (31m),
/// finishing 1m from the pin.
pub fn par4_samples(user_id: UserId, round_id: RoundId) -> Vec<LocationUpdate> {
    let tee = tee();
    let drive = tee.destination(0.0, 240.0);
    let approach = drive.destination(0.0, 90.0);
    let pitch = approach.destination(0.0, 31.0);
    vec![
        update(user_id, round_id, tee, Some(0.0), 0),
        update(user_id, round_id, tee, Some(0.0), 10),
        update(user_id, round_id, drive, Some(24.0), 20),
        update(user_id, round_id, drive, Some(0.0), 80),
        update(user_id, round_id, approach, Some(9.0), 90),
        update(user_id, round_id, approach, Some(0.0), 150),
        update(user_id, round_id, pitch, Some(3.0), 160),
    ]
}

pub fn finish_of(samples: &[LocationUpdate]) -> Coordinate {
    samples
        .last()
        .map(|u| u.sample.coordinate)
        .expect("at least one sample")
}
