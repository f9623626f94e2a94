use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::TrackId;

/// One tracker observation: left-top-right-bottom box in pixel space and,
/// if the tracker could associate it, a persistent track identity.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub track_id: Option<TrackId>,
    #[serde(rename = "p", default)]
    pub confidence: f32,
    #[serde(rename = "c", default)]
    pub class: i32,
}

impl Detection {
    pub fn new(bbox: BBox<Ltrb>, track_id: Option<TrackId>) -> Self {
        Self {
            x1: bbox.left(),
            y1: bbox.top(),
            x2: bbox.right(),
            y2: bbox.bottom(),
            track_id,
            confidence: 1.0,
            class: 0,
        }
    }

    #[inline]
    pub fn tracked(track_id: TrackId, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(BBox::ltrb(x1, y1, x2, y2), Some(track_id))
    }

    #[inline]
    pub fn untracked(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self::new(BBox::ltrb(x1, y1, x2, y2), None)
    }

    #[inline(always)]
    pub fn bbox(&self) -> BBox<Ltrb> {
        BBox::ltrb(self.x1, self.y1, self.x2, self.y2)
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.bbox().is_valid()
    }

    #[inline]
    pub fn centroid(&self) -> na::Point2<i32> {
        self.bbox().centroid()
    }

    /// Maps a detection from a resized inference image back onto the source frame.
    pub fn rescale(&self, sx: f32, sy: f32) -> Self {
        let bbox = self.bbox().scaled(sx, sy);

        Self {
            x1: bbox.left(),
            y1: bbox.top(),
            x2: bbox.right(),
            y2: bbox.bottom(),
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Detection;

    #[test]
    fn test_parse_dump_format() {
        let json = r#"[{"x1":1,"y1":2,"x2":11,"y2":22,"id":7,"p":0.8,"c":2},{"x1":0,"y1":0,"x2":4,"y2":4}]"#;
        let dets: Vec<Detection> = serde_json::from_str(json).unwrap();

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].track_id, Some(7));
        assert_eq!(dets[0].class, 2);
        assert_eq!(dets[1].track_id, None);
        assert_eq!(dets[1].confidence, 0.0);
    }

    #[test]
    fn test_rescale_keeps_identity() {
        let d = Detection::tracked(3, 10.0, 10.0, 20.0, 30.0).rescale(2.0, 2.0);
        assert_eq!(d.track_id, Some(3));
        assert_eq!((d.x1, d.y1, d.x2, d.y2), (20.0, 20.0, 40.0, 60.0));
    }
}
