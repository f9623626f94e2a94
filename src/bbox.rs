use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat> BBox<F> {
    /// Multiplies x-axis values by `sx` and y-axis values by `sy`.
    ///
    /// Every supported format keeps x in slots 0 and 2 and y in slots 1 and 3,
    /// so the same scaling applies to all of them.
    #[inline]
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        BBox(
            [self.0[0] * sx, self.0[1] * sy, self.0[2] * sx, self.0[3] * sy],
            Default::default(),
        )
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        BBox([x1, y1, x2, y2], Default::default())
    }

    #[inline]
    pub fn as_xywh(&self) -> BBox<Xywh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    /// Positive, finite width and height.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
            && self.left() < self.right()
            && self.top() < self.bottom()
    }

    #[inline]
    pub fn top_left(&self) -> na::Point2<i32> {
        na::Point2::new(self.left() as i32, self.top() as i32)
    }

    #[inline]
    pub fn bottom_right(&self) -> na::Point2<i32> {
        na::Point2::new(self.right() as i32, self.bottom() as i32)
    }

    /// Center of the box truncated to whole pixels.
    #[inline]
    pub fn centroid(&self) -> na::Point2<i32> {
        let c = self.as_xywh();

        na::Point2::new(c.cx() as i32, c.cy() as i32)
    }
}

impl BBox<Xywh> {
    #[inline(always)]
    pub fn cx(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn cy(&self) -> f32 {
        self.0[1]
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Xywh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [
                v.0[0] + (v.0[2] - v.0[0]) / 2.0,
                v.0[1] + (v.0[3] - v.0[1]) / 2.0,
                v.0[2] - v.0[0],
                v.0[3] - v.0[1],
            ],
            Default::default(),
        )
    }
}
