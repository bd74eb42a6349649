use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::course::{CourseId, HoleLayout, Round, RoundId};
use crate::error::StorageError;
use crate::sample::TrackedLocation;

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn get_hole_by_number(
        &self,
        course_id: CourseId,
        hole_number: u32,
    ) -> Result<Option<HoleLayout>, StorageError>;

    async fn get_holes_by_course(&self, course_id: CourseId)
        -> Result<Vec<HoleLayout>, StorageError>;
}

#[async_trait]
pub trait RoundRepository: Send + Sync {
    async fn get_by_id(&self, round_id: RoundId) -> Result<Option<Round>, StorageError>;

    async fn update_hole_score(
        &self,
        round_id: RoundId,
        hole_number: u32,
        score: u32,
    ) -> Result<(), StorageError>;
}

#[async_trait]
pub trait LocationStore: Send + Sync {
    async fn create(&self, location: TrackedLocation) -> Result<TrackedLocation, StorageError>;

    /// Samples for `round_id` at or after `cutoff`, oldest first.
    async fn get_since(
        &self,
        round_id: RoundId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TrackedLocation>, StorageError>;
}

/// Course description as stored on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseFile {
    pub course_id: CourseId,
    #[serde(default)]
    pub name: Option<String>,
    pub holes: Vec<HoleLayout>,
}

impl CourseFile {
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Process-local implementation of every repository, used by the CLI and
/// by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    courses: RwLock<HashMap<CourseId, Vec<HoleLayout>>>,
    rounds: RwLock<HashMap<RoundId, Round>>,
    scores: RwLock<HashMap<(RoundId, u32), u32>>,
    locations: RwLock<Vec<TrackedLocation>>,
    next_location_id: AtomicU64,
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("memory store lock poisoned".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_course(&self, course_id: CourseId, holes: Vec<HoleLayout>) -> Result<(), StorageError> {
        self.courses.write().map_err(poisoned)?.insert(course_id, holes);
        Ok(())
    }

    pub fn insert_course_file(&self, course: CourseFile) -> Result<(), StorageError> {
        self.insert_course(course.course_id, course.holes)
    }

    pub fn insert_round(&self, round: Round) -> Result<(), StorageError> {
        self.rounds.write().map_err(poisoned)?.insert(round.id, round);
        Ok(())
    }

    /// Recorded scores for a round, ordered by hole number.
    pub fn hole_scores(&self, round_id: RoundId) -> Result<Vec<(u32, u32)>, StorageError> {
        let scores = self.scores.read().map_err(poisoned)?;
        let mut out: Vec<(u32, u32)> = scores
            .iter()
            .filter(|((round, _), _)| *round == round_id)
            .map(|((_, hole), score)| (*hole, *score))
            .collect();
        out.sort_unstable();
        Ok(out)
    }

    pub fn location_count(&self, round_id: RoundId) -> Result<usize, StorageError> {
        let locations = self.locations.read().map_err(poisoned)?;
        Ok(locations.iter().filter(|l| l.round_id == round_id).count())
    }
}

#[async_trait]
impl CourseRepository for MemoryStore {
    async fn get_hole_by_number(
        &self,
        course_id: CourseId,
        hole_number: u32,
    ) -> Result<Option<HoleLayout>, StorageError> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses
            .get(&course_id)
            .and_then(|holes| holes.iter().find(|h| h.hole_number == hole_number))
            .cloned())
    }

    async fn get_holes_by_course(
        &self,
        course_id: CourseId,
    ) -> Result<Vec<HoleLayout>, StorageError> {
        let courses = self.courses.read().map_err(poisoned)?;
        courses
            .get(&course_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("course {}", course_id)))
    }
}

#[async_trait]
impl RoundRepository for MemoryStore {
    async fn get_by_id(&self, round_id: RoundId) -> Result<Option<Round>, StorageError> {
        Ok(self.rounds.read().map_err(poisoned)?.get(&round_id).cloned())
    }

    async fn update_hole_score(
        &self,
        round_id: RoundId,
        hole_number: u32,
        score: u32,
    ) -> Result<(), StorageError> {
        if !self.rounds.read().map_err(poisoned)?.contains_key(&round_id) {
            return Err(StorageError::NotFound(format!("round {}", round_id)));
        }
        self.scores
            .write()
            .map_err(poisoned)?
            .insert((round_id, hole_number), score);
        Ok(())
    }
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn create(&self, mut location: TrackedLocation) -> Result<TrackedLocation, StorageError> {
        location.id = Some(self.next_location_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.locations
            .write()
            .map_err(poisoned)?
            .push(location.clone());
        Ok(location)
    }

    async fn get_since(
        &self,
        round_id: RoundId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<TrackedLocation>, StorageError> {
        let locations = self.locations.read().map_err(poisoned)?;
        let mut out: Vec<TrackedLocation> = locations
            .iter()
            .filter(|l| l.round_id == round_id && l.sample.timestamp >= cutoff)
            .cloned()
            .collect();
        out.sort_by_key(|l| l.sample.timestamp);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;
    use crate::position::PositionReading;
    use crate::sample::LocationSample;
    use chrono::Duration;

    fn tracked(round_id: RoundId, timestamp: DateTime<Utc>) -> TrackedLocation {
        TrackedLocation {
            id: None,
            user_id: 1,
            round_id,
            sample: LocationSample {
                coordinate: Coordinate::new(0.0, 0.0).unwrap(),
                accuracy: 5.0,
                speed: None,
                timestamp,
            },
            reading: PositionReading::unknown(),
            shot: None,
        }
    }

    #[tokio::test]
    async fn hole_lookup_distinguishes_missing_hole_from_missing_course() {
        let store = MemoryStore::new();
        store
            .insert_course(
                3,
                vec![HoleLayout {
                    hole_number: 1,
                    par: 4,
                    tee: None,
                    pin: None,
                }],
            )
            .unwrap();

        assert!(store.get_hole_by_number(3, 1).await.unwrap().is_some());
        assert!(store.get_hole_by_number(3, 2).await.unwrap().is_none());
        assert!(matches!(
            store.get_holes_by_course(4).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn score_update_requires_known_round() {
        let store = MemoryStore::new();
        store
            .insert_round(Round {
                id: 10,
                user_id: 1,
                course_id: 3,
            })
            .unwrap();

        store.update_hole_score(10, 2, 5).await.unwrap();
        store.update_hole_score(10, 1, 4).await.unwrap();
        assert_eq!(store.hole_scores(10).unwrap(), vec![(1, 4), (2, 5)]);
        assert!(store.update_hole_score(11, 1, 4).await.is_err());
    }

    #[tokio::test]
    async fn locations_are_filtered_by_round_and_cutoff() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let first = store.create(tracked(1, now - Duration::minutes(10))).await.unwrap();
        store.create(tracked(1, now)).await.unwrap();
        store.create(tracked(2, now)).await.unwrap();

        assert_eq!(first.id, Some(1));
        let since = store.get_since(1, now - Duration::minutes(5)).await.unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(store.location_count(1).unwrap(), 2);
    }
}
