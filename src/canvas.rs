use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_line_segment_mut, draw_text_mut};
use log::trace;
use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel order of OpenCV frames.
    #[inline]
    pub fn bgr(&self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }

    /// Linear blend, `t = 0` gives `from`, `t = 1` gives `to`.
    pub fn lerp(from: Color, to: Color, t: f32) -> Color {
        let t = num_traits::clamp(t, 0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 * (1.0 - t) + b as f32 * t).round() as u8;

        Color::rgb(mix(from.r, to.r), mix(from.g, to.g), mix(from.b, to.b))
    }
}

impl From<Color> for Rgb<u8> {
    #[inline]
    fn from(c: Color) -> Self {
        Rgb([c.r, c.g, c.b])
    }
}

/// Drawing surface the annotator renders onto.
///
/// Coordinates may lie anywhere in the `i32` range, implementations clip to
/// their own bounds.
pub trait Canvas {
    /// (width, height) in pixels
    fn dims(&self) -> (u32, u32);

    fn line(
        &mut self,
        from: na::Point2<i32>,
        to: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error>;

    fn rectangle(
        &mut self,
        top_left: na::Point2<i32>,
        bottom_right: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error>;

    /// `origin` is the bottom-left corner of the text.
    fn text(
        &mut self,
        origin: na::Point2<i32>,
        text: &str,
        color: Color,
        scale: f32,
    ) -> Result<(), Error>;

    /// Font for backends without one of their own.
    fn use_font(&mut self, _font: &FontArc) {}
}

/// Reads a TrueType/OpenType font for labels drawn on a [`Raster`].
pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc, Error> {
    let path = path.as_ref();
    let data = std::fs::read(path)
        .map_err(|err| Error::Config(format!("font {}: {}", path.display(), err)))?;

    FontArc::try_from_vec(data)
        .map_err(|err| Error::Config(format!("font {}: {}", path.display(), err)))
}

// pixel height of text at scale 1.0, close to the Hershey simplex face
const TEXT_PX_PER_SCALE: f32 = 24.0;

const TEXT_ORIGIN_LIMIT: i32 = 1 << 20;

/// In-memory RGB frame. Text needs a font, without one labels are skipped.
#[derive(Clone)]
pub struct Raster {
    image: RgbImage,
    font: Option<FontArc>,
}

impl std::fmt::Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("font", &self.font.is_some())
            .finish()
    }
}

// frames compare by content, the font is a drawing aid
impl PartialEq for Raster {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_image(RgbImage::new(width, height))
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, color.into()))
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self { image, font: None }
    }

    pub fn fill(&mut self, color: Color) {
        let px: Rgb<u8> = color.into();

        for p in self.image.pixels_mut() {
            *p = px;
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        self.image
            .get_pixel_checked(x, y)
            .map(|Rgb([r, g, b])| Color::rgb(*r, *g, *b))
    }

    /// Number of pixels equal to `color`.
    pub fn count(&self, color: Color) -> usize {
        let px: Rgb<u8> = color.into();

        self.image.pixels().filter(|p| **p == px).count()
    }

    fn segment(&mut self, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
        if let Some((a, b)) = clip_segment(from, to, self.image.dimensions()) {
            draw_line_segment_mut(&mut self.image, a, b, color);
        }
    }
}

impl Canvas for Raster {
    #[inline]
    fn dims(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn line(
        &mut self,
        from: na::Point2<i32>,
        to: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error> {
        let (x0, y0) = (from.x as f64, from.y as f64);
        let (x1, y1) = (to.x as f64, to.y as f64);

        // thick lines are parallel copies along the minor axis
        let horizontal = (x1 - x0).abs() >= (y1 - y0).abs();

        for o in offsets(thickness) {
            let (ox, oy) = if horizontal { (0.0, o) } else { (o, 0.0) };

            self.segment((x0 + ox, y0 + oy), (x1 + ox, y1 + oy), color.into());
        }

        Ok(())
    }

    fn rectangle(
        &mut self,
        top_left: na::Point2<i32>,
        bottom_right: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error> {
        let px: Rgb<u8> = color.into();

        for o in offsets(thickness) {
            let (l, t) = (top_left.x as f64 - o, top_left.y as f64 - o);
            let (r, b) = (bottom_right.x as f64 + o, bottom_right.y as f64 + o);

            self.segment((l, t), (r, t), px);
            self.segment((r, t), (r, b), px);
            self.segment((r, b), (l, b), px);
            self.segment((l, b), (l, t), px);
        }

        Ok(())
    }

    fn text(
        &mut self,
        origin: na::Point2<i32>,
        text: &str,
        color: Color,
        scale: f32,
    ) -> Result<(), Error> {
        let font = match &self.font {
            Some(font) => font,
            None => {
                trace!("no font attached, skipping text {:?}", text);
                return Ok(());
            }
        };

        let px = (scale * TEXT_PX_PER_SCALE).max(1.0);
        let (w, h) = self.image.dimensions();
        let top = origin.y.saturating_sub(px as i32);

        // nothing of a text starting right or below the frame is visible
        if origin.x >= w as i32 || top >= h as i32 {
            return Ok(());
        }

        // glyph offsets are added to the origin, keep it far from overflowing
        draw_text_mut(
            &mut self.image,
            color.into(),
            origin.x.max(-TEXT_ORIGIN_LIMIT),
            top.max(-TEXT_ORIGIN_LIMIT),
            PxScale::from(px),
            font,
            text,
        );

        Ok(())
    }

    fn use_font(&mut self, font: &FontArc) {
        self.font = Some(font.clone());
    }
}

/// Offsets of the parallel strokes making up a line of `thickness` pixels.
fn offsets(thickness: i32) -> impl Iterator<Item = f64> {
    let t = thickness.max(1);
    let lo = -((t - 1) / 2);

    (lo..lo + t).map(|o| o as f64)
}

const INSIDE: u8 = 0;
const LEFT: u8 = 1;
const RIGHT: u8 = 2;
const BOTTOM: u8 = 4;
const TOP: u8 = 8;

/// Cohen-Sutherland clipping of a segment to the pixel grid of a
/// `width x height` image. `None` if no part of the segment is visible.
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    (width, height): (u32, u32),
) -> Option<((f32, f32), (f32, f32))> {
    if width == 0 || height == 0 {
        return None;
    }

    let (xmax, ymax) = ((width - 1) as f64, (height - 1) as f64);

    let code = |(x, y): (f64, f64)| {
        let mut c = INSIDE;

        if x < 0.0 {
            c |= LEFT;
        } else if x > xmax {
            c |= RIGHT;
        }

        if y < 0.0 {
            c |= TOP;
        } else if y > ymax {
            c |= BOTTOM;
        }

        c
    };

    let (mut a, mut b) = (from, to);
    let (mut ca, mut cb) = (code(a), code(b));

    loop {
        if ca | cb == INSIDE {
            return Some(((a.0 as f32, a.1 as f32), (b.0 as f32, b.1 as f32)));
        }

        if ca & cb != INSIDE {
            return None;
        }

        let out = if ca != INSIDE { ca } else { cb };
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);

        let p = if out & TOP != 0 {
            (a.0 + dx * (0.0 - a.1) / dy, 0.0)
        } else if out & BOTTOM != 0 {
            (a.0 + dx * (ymax - a.1) / dy, ymax)
        } else if out & RIGHT != 0 {
            (xmax, a.1 + dy * (xmax - a.0) / dx)
        } else {
            (0.0, a.1 + dy * (0.0 - a.0) / dx)
        };

        if out == ca {
            a = p;
            ca = code(a);
        } else {
            b = p;
            cb = code(b);
        }
    }
}
