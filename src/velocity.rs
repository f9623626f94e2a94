use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::track::Centroid;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum Risk {
    Low,
    High,
}

/// Speed in px/s from the last two positions of `history`.
///
/// Assumes one recorded position per processed frame at a constant frame rate,
/// so the distance between the last two points is pixels per frame.
pub fn estimate(history: &[Centroid], fps: f32) -> f32 {
    if history.len() < 2 || !fps.is_finite() || fps <= 0.0 {
        return 0.0;
    }

    let prev = history[history.len() - 2];
    let last = history[history.len() - 1];

    na::distance(&to_f32(prev), &to_f32(last)) * fps
}

#[inline]
pub fn classify(speed: f32, threshold: f32) -> Risk {
    if speed < threshold {
        Risk::Low
    } else {
        Risk::High
    }
}

#[inline(always)]
pub(crate) fn to_f32(p: Centroid) -> na::Point2<f32> {
    na::Point2::new(p.x as f32, p.y as f32)
}
