use std::collections::HashMap;

use crate::track::{Centroid, Track};
use crate::TrackId;

/// Per-run mapping from track identity to its recent centroid history.
///
/// A store belongs to exactly one processing run. Tracks are created on first
/// sighting and are never removed; identities that stop reappearing simply go
/// dormant until the store is dropped.
#[derive(Debug, Default)]
pub struct TrajectoryStore {
    tracks: HashMap<TrackId, Track>,
    frame: usize,
}

impl TrajectoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the frame index stamped on subsequent `record` calls.
    #[inline]
    pub fn begin_frame(&mut self, frame: usize) {
        self.frame = frame;
    }

    /// Appends `centroid` to the history of `track_id` and keeps only the most
    /// recent `capacity` entries. Returns the updated history, oldest first.
    pub fn record(&mut self, track_id: TrackId, centroid: Centroid, capacity: usize) -> &[Centroid] {
        let frame = self.frame;

        self.tracks
            .entry(track_id)
            .or_insert_with(|| Track::new(track_id, capacity, frame))
            .push(centroid, capacity, frame)
    }

    #[inline]
    pub fn get(&self, track_id: TrackId) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Tracks not seen during the `max_age` frames before `current_frame`,
    /// ordered by identity.
    pub fn dormant(&self, current_frame: usize, max_age: usize) -> Vec<TrackId> {
        let mut ids: Vec<_> = self
            .tracks
            .values()
            .filter(|t| t.is_dormant(current_frame, max_age))
            .map(|t| t.track_id)
            .collect();

        ids.sort_unstable();
        ids
    }
}
