use nalgebra as na;

use crate::canvas::{Canvas, Color};
use crate::config::Config;
use crate::detection::Detection;
use crate::error::Error;
use crate::track::Centroid;
use crate::velocity::{self, Risk};

#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub low_risk_color: Color,
    pub high_risk_color: Color,
    pub untracked_color: Color,
    pub trail_start_color: Color,
    pub trail_end_color: Color,
    pub box_thickness: i32,
    pub trail_thickness: i32,
    pub label_scale: f32,
}

impl Default for Style {
    fn default() -> Self {
        Style::from(&Config::default())
    }
}

impl From<&Config> for Style {
    fn from(cfg: &Config) -> Self {
        Self {
            low_risk_color: cfg.low_risk_color,
            high_risk_color: cfg.high_risk_color,
            untracked_color: cfg.untracked_color,
            trail_start_color: cfg.trail_start_color,
            trail_end_color: cfg.trail_end_color,
            box_thickness: cfg.box_thickness,
            trail_thickness: cfg.trail_thickness,
            label_scale: cfg.label_scale,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Annotator {
    pub style: Style,
}

impl Annotator {
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    /// Draws the risk-colored box, the identity label and the fading trail of a
    /// tracked detection. The box is expected to be well formed, it may lie
    /// partly or wholly outside the frame.
    pub fn annotate<C: Canvas + ?Sized>(
        &self,
        frame: &mut C,
        detection: &Detection,
        history: &[Centroid],
        speed: f32,
        risk_threshold: f32,
    ) -> Result<Risk, Error> {
        let risk = velocity::classify(speed, risk_threshold);
        let color = match risk {
            Risk::Low => self.style.low_risk_color,
            Risk::High => self.style.high_risk_color,
        };

        self.draw_trail(frame, history)?;

        let bbox = detection.bbox();
        frame.rectangle(
            bbox.top_left(),
            bbox.bottom_right(),
            color,
            self.style.box_thickness,
        )?;

        if let Some(id) = detection.track_id {
            let tl = bbox.top_left();
            frame.text(
                na::Point2::new(tl.x, tl.y.saturating_sub(4)),
                &format!("ID: {}", id),
                color,
                self.style.label_scale,
            )?;
        }

        Ok(risk)
    }

    /// Box without label, trail or risk color.
    pub fn annotate_untracked<C: Canvas + ?Sized>(
        &self,
        frame: &mut C,
        detection: &Detection,
    ) -> Result<(), Error> {
        let bbox = detection.bbox();

        frame.rectangle(
            bbox.top_left(),
            bbox.bottom_right(),
            self.style.untracked_color,
            self.style.box_thickness,
        )
    }

    /// Connects consecutive history points, `L - 1` segments for `L` points.
    /// Segment `i` is colored at fade factor `i / L` between the trail colors.
    pub fn draw_trail<C: Canvas + ?Sized>(
        &self,
        frame: &mut C,
        history: &[Centroid],
    ) -> Result<(), Error> {
        let len = history.len();

        for (i, seg) in history.windows(2).enumerate() {
            let color = Color::lerp(
                self.style.trail_start_color,
                self.style.trail_end_color,
                i as f32 / len as f32,
            );

            frame.line(seg[0], seg[1], color, self.style.trail_thickness)?;
        }

        Ok(())
    }

    /// Line between two tracks that came too close.
    pub fn draw_link<C: Canvas + ?Sized>(
        &self,
        frame: &mut C,
        a: Centroid,
        b: Centroid,
    ) -> Result<(), Error> {
        frame.line(a, b, self.style.high_risk_color, self.style.box_thickness)
    }

    pub fn draw_frame_index<C: Canvas + ?Sized>(
        &self,
        frame: &mut C,
        index: usize,
    ) -> Result<(), Error> {
        frame.text(
            na::Point2::new(10, 30),
            &format!("{}", index),
            Color::YELLOW,
            self.style.label_scale * 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Raster;

    #[derive(Debug, PartialEq)]
    enum Op {
        Line(Centroid, Centroid, Color),
        Rect(Centroid, Centroid, Color),
        Text(String, Color),
    }

    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
    }

    impl Recorder {
        fn lines(&self) -> Vec<(Centroid, Centroid, Color)> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Line(a, b, c) => Some((*a, *b, *c)),
                    _ => None,
                })
                .collect()
        }

        fn rects(&self) -> Vec<Color> {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Rect(_, _, c) => Some(*c),
                    _ => None,
                })
                .collect()
        }
    }

    impl Canvas for Recorder {
        fn dims(&self) -> (u32, u32) {
            (640, 480)
        }

        fn line(&mut self, a: Centroid, b: Centroid, c: Color, _: i32) -> Result<(), Error> {
            self.ops.push(Op::Line(a, b, c));
            Ok(())
        }

        fn rectangle(&mut self, a: Centroid, b: Centroid, c: Color, _: i32) -> Result<(), Error> {
            self.ops.push(Op::Rect(a, b, c));
            Ok(())
        }

        fn text(&mut self, _: Centroid, t: &str, c: Color, _: f32) -> Result<(), Error> {
            self.ops.push(Op::Text(t.to_string(), c));
            Ok(())
        }
    }

    fn trail(n: i32) -> Vec<Centroid> {
        (0..n).map(|i| na::Point2::new(i * 10, 50)).collect()
    }

    #[test]
    fn test_low_and_high_risk_colors() {
        let annotator = Annotator::default();
        let det = Detection::tracked(7, 10.0, 10.0, 50.0, 60.0);

        let mut slow = Recorder::default();
        let risk = annotator.annotate(&mut slow, &det, &[], 10.0, 100.0).unwrap();
        assert_eq!(risk, Risk::Low);
        assert_eq!(slow.rects(), vec![Color::GREEN]);

        let mut fast = Recorder::default();
        let risk = annotator.annotate(&mut fast, &det, &[], 100.0, 100.0).unwrap();
        assert_eq!(risk, Risk::High);
        assert_eq!(fast.rects(), vec![Color::RED]);
    }

    #[test]
    fn test_label_shows_identity() {
        let annotator = Annotator::default();
        let det = Detection::tracked(42, 10.0, 20.0, 30.0, 40.0);
        let mut rec = Recorder::default();

        annotator.annotate(&mut rec, &det, &[], 0.0, 1.0).unwrap();
        assert!(rec.ops.contains(&Op::Text("ID: 42".into(), Color::GREEN)));
        assert!(rec.ops.contains(&Op::Rect(
            na::Point2::new(10, 20),
            na::Point2::new(30, 40),
            Color::GREEN
        )));
    }

    #[test]
    fn test_trail_draws_len_minus_one_segments() {
        let annotator = Annotator::default();

        for n in 0..12 {
            let mut rec = Recorder::default();
            annotator.draw_trail(&mut rec, &trail(n)).unwrap();
            assert_eq!(rec.lines().len(), (n as usize).saturating_sub(1));
        }
    }

    #[test]
    fn test_trail_fade_is_monotonic() {
        let style = Style {
            trail_start_color: Color::rgb(0, 0, 0),
            trail_end_color: Color::rgb(250, 0, 0),
            ..Default::default()
        };
        let annotator = Annotator::new(style);
        let history = trail(10);
        let mut rec = Recorder::default();

        annotator.draw_trail(&mut rec, &history).unwrap();
        let lines = rec.lines();

        assert_eq!(lines[0].2, Color::rgb(0, 0, 0));
        // last segment index 8 of 10 points
        assert_eq!(lines[8].2, Color::rgb(200, 0, 0));
        assert!(lines.windows(2).all(|w| w[0].2.r < w[1].2.r));
        assert_eq!((lines[3].0, lines[3].1), (history[3], history[4]));
    }

    #[test]
    fn test_untracked_box_uses_neutral_color() {
        let annotator = Annotator::default();
        let mut rec = Recorder::default();

        annotator
            .annotate_untracked(&mut rec, &Detection::untracked(0.0, 0.0, 5.0, 5.0))
            .unwrap();
        assert_eq!(rec.rects(), vec![Color::GRAY]);
        assert!(rec.lines().is_empty());
    }

    #[test]
    fn test_default_style_follows_config() {
        let style = Style::default();
        let cfg = Config::default();

        assert_eq!(style.low_risk_color, cfg.low_risk_color);
        assert_eq!(style.trail_end_color, cfg.trail_end_color);
        assert_eq!(style.box_thickness, cfg.box_thickness);
    }

    #[test]
    fn test_label_above_top_edge_saturates() {
        let annotator = Annotator::default();
        let det = Detection::tracked(3, 0.0, -3.0e9, 10.0, 10.0);
        let mut rec = Recorder::default();

        annotator.annotate(&mut rec, &det, &[], 0.0, 1.0).unwrap();
        assert!(rec.ops.contains(&Op::Text("ID: 3".into(), Color::GREEN)));
    }

    #[test]
    fn test_out_of_frame_boxes_on_raster() {
        let annotator = Annotator::default();
        let boxes = [
            Detection::tracked(1, -3.0e9, 5.0, 3.0e9, 20.0),
            Detection::tracked(2, 5.0, -3.0e9, 20.0, 20.0),
            Detection::tracked(3, 10.0, 10.0, 2.0e8, 30.0),
            Detection::tracked(4, 1.0e6, 1.0e6, 1.0e6 + 50.0, 1.0e6 + 50.0),
        ];
        let started = std::time::Instant::now();

        for det in &boxes {
            assert!(det.is_valid());

            let mut frame = Raster::new(64, 48);
            let history = [na::Point2::new(-2_000_000_000, 0), det.centroid()];

            annotator
                .annotate(&mut frame, det, &history, 10.0, 100.0)
                .unwrap();
        }

        assert!(started.elapsed() < std::time::Duration::from_secs(2));
    }

    #[test]
    fn test_annotate_on_raster() {
        let annotator = Annotator::default();
        let mut frame = Raster::new(64, 64);
        let det = Detection::tracked(1, 1.0, 1.0, 62.0, 62.0);

        annotator
            .annotate(&mut frame, &det, &trail(4), 500.0, 100.0)
            .unwrap();
        assert!(frame.count(Color::RED) > 0);
        assert_eq!(frame.count(Color::GREEN), 0);
    }
}
