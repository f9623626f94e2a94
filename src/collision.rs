use nalgebra as na;

use crate::track::Centroid;
use crate::velocity::to_f32;
use crate::TrackId;

/// Two distinct tracks whose centroids are closer than the configured distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityPair {
    pub a: TrackId,
    pub b: TrackId,
    pub distance: f32,
}

/// All unordered pairs of distinct tracks within `max_distance` pixels, `a < b`,
/// sorted by `(a, b)`. Repeated identities are compared once.
pub fn proximity_pairs(points: &[(TrackId, Centroid)], max_distance: f32) -> Vec<ProximityPair> {
    let mut pairs = Vec::new();

    if max_distance.is_nan() || max_distance <= 0.0 {
        return pairs;
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(id, _)| *id);
    sorted.dedup_by_key(|(id, _)| *id);

    for (i, (a, pa)) in sorted.iter().enumerate() {
        for (b, pb) in &sorted[i + 1..] {
            let distance = na::distance(&to_f32(*pa), &to_f32(*pb));

            if distance < max_distance {
                pairs.push(ProximityPair {
                    a: *a,
                    b: *b,
                    distance,
                });
            }
        }
    }

    pairs
}
