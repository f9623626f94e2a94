use nalgebra as na;

use crate::circular_queue::CircularQueue;
use crate::TrackId;

pub type Centroid = na::Point2<i32>;

#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: TrackId,

    // frame indexes
    pub first_seen: usize,
    pub last_seen: usize,

    // centroids, oldest first
    history: CircularQueue<Centroid>,
}

impl Track {
    pub fn new(track_id: TrackId, capacity: usize, frame: usize) -> Self {
        Self {
            track_id,
            first_seen: frame,
            last_seen: frame,
            history: CircularQueue::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, centroid: Centroid, capacity: usize, frame: usize) -> &[Centroid] {
        if self.history.capacity() != capacity {
            self.history.set_capacity(capacity);
        }

        self.history.push(centroid);
        self.last_seen = frame;

        self.history.as_slice()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    #[inline]
    pub fn position(&self) -> Option<Centroid> {
        self.history.newest().copied()
    }

    #[inline]
    pub fn positions(&self) -> impl DoubleEndedIterator<Item = &Centroid> {
        self.history.iter()
    }

    #[inline]
    pub fn is_dormant(&self, frame: usize, max_age: usize) -> bool {
        frame.saturating_sub(self.last_seen) > max_age
    }
}
