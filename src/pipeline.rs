use ab_glyph::FontArc;
use log::{debug, error, info, trace, warn};
use serde_derive::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::adapter::TrackerAdapter;
use crate::annotator::{Annotator, Style};
use crate::canvas::{self, Canvas};
use crate::collision;
use crate::config::Config;
use crate::error::Error;
use crate::frame::Frame;
use crate::trajectory::TrajectoryStore;
use crate::velocity::{self, Risk};
use crate::video::{VideoMeta, VideoSink, VideoSource};

/// Cooperative cancellation, checked between frames.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run counters. Every per-frame degradation ends up here.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub frames_read: usize,
    pub frames_written: usize,
    pub adapter_failures: usize,
    pub invalid_detections: usize,
    pub untracked_detections: usize,
    pub untracked_drawn: usize,
    pub draw_failures: usize,
    pub high_risk_observations: usize,
    pub proximity_events: usize,
    pub tracks: usize,
    pub dormant_tracks: usize,

    // source stopped with a read error instead of a clean end of stream
    pub truncated: bool,
    pub cancelled: bool,
}

/// Runs tracking and annotation over a whole video.
///
/// A pipeline only holds configuration, every run gets its own trajectory
/// store, so one pipeline can serve several runs.
pub struct Pipeline {
    config: Config,
    annotator: Annotator,
    font: Option<FontArc>,
    cancel: CancelToken,
}

impl Pipeline {
    /// Validates `config` and loads the label font if one is configured.
    pub fn new(config: Config) -> Result<Self, Error> {
        config.validate()?;

        let font = match &config.font_path {
            Some(path) => Some(canvas::load_font(path)?),
            None => None,
        };

        Ok(Self {
            annotator: Annotator::new(Style::from(&config)),
            config,
            font,
            cancel: CancelToken::new(),
        })
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Opens the source, then creates the sink from the source metadata, then
    /// processes every frame. Nothing is created if the source fails to open.
    ///
    /// A source that fails mid-stream still yields `Ok`: every frame read
    /// before the failure is written and `RunStats::truncated` is set, so
    /// callers needing the complete video must check it.
    pub fn run<S, A, K, O, M>(
        &self,
        open_source: O,
        adapter: &mut A,
        make_sink: M,
    ) -> Result<(K, RunStats), Error>
    where
        S: VideoSource,
        S::Image: Canvas,
        A: TrackerAdapter<S::Image> + ?Sized,
        K: VideoSink<S::Image>,
        O: FnOnce() -> Result<S, Error>,
        M: FnOnce(&VideoMeta) -> Result<K, Error>,
    {
        let source = open_source().map_err(|err| match err {
            Error::SourceUnavailable(_) => err,
            other => Error::SourceUnavailable(other.to_string()),
        })?;

        let meta = source.meta();
        let mut sink = make_sink(&meta).map_err(|err| match err {
            Error::SinkWriteFailure { .. } => err,
            other => Error::sink(0, other),
        })?;

        let stats = self.process(source, adapter, &mut sink)?;

        Ok((sink, stats))
    }

    /// Frame loop over an already opened source and sink.
    ///
    /// Speeds are measured per elapsed frame: when a track was last seen
    /// several frames ago (adapter failure, occlusion) the displacement is
    /// spread over that gap.
    pub fn process<S, A, K>(
        &self,
        mut source: S,
        adapter: &mut A,
        sink: &mut K,
    ) -> Result<RunStats, Error>
    where
        S: VideoSource,
        S::Image: Canvas,
        A: TrackerAdapter<S::Image> + ?Sized,
        K: VideoSink<S::Image> + ?Sized,
    {
        let meta = source.meta();
        let mut store = TrajectoryStore::new();
        let mut stats = RunStats::default();

        info!(
            "processing video {}x{} @ {} fps, {:?} frames",
            meta.width, meta.height, meta.fps, meta.frame_count
        );

        loop {
            if self.cancel.is_cancelled() {
                info!("cancelled after {} frames", stats.frames_written);
                self.finish_stats(&store, &mut stats);
                stats.cancelled = true;

                return Err(Error::Cancelled {
                    frames_written: stats.frames_written,
                    stats: Box::new(stats),
                });
            }

            let index = stats.frames_read;
            let mut image = match source.read() {
                Ok(Some(image)) => image,
                Ok(None) => break,
                Err(err) => {
                    error!("frame {}: source read failed, output is truncated: {}", index, err);
                    stats.truncated = true;
                    break;
                }
            };
            stats.frames_read += 1;

            if let Some(font) = &self.font {
                image.use_font(font);
            }

            store.begin_frame(index);

            match adapter.track(index, &image, &self.config.tracker) {
                Ok(detections) => {
                    let frame = Frame::new(index, detections);
                    self.annotate_frame(&mut image, &mut store, &frame, meta.fps, &mut stats);
                }
                Err(err) => {
                    warn!("frame {}: passing through unannotated: {}", index, err);
                    stats.adapter_failures += 1;
                }
            }

            if self.config.draw_frame_index {
                if let Err(err) = self.annotator.draw_frame_index(&mut image, index + 1) {
                    warn!("frame {}: {}", index, err);
                    stats.draw_failures += 1;
                }
            }

            sink.write(&image).map_err(|err| match err {
                Error::SinkWriteFailure { .. } => err,
                other => Error::sink(index, other),
            })?;
            stats.frames_written += 1;
        }

        sink.finish().map_err(|err| match err {
            Error::SinkWriteFailure { .. } => err,
            other => Error::sink(stats.frames_written, other),
        })?;

        self.finish_stats(&store, &mut stats);

        info!(
            "finished: {} frames, {} tracks, {} adapter failures, {} high risk observations",
            stats.frames_written, stats.tracks, stats.adapter_failures, stats.high_risk_observations
        );

        Ok(stats)
    }

    fn finish_stats(&self, store: &TrajectoryStore, stats: &mut RunStats) {
        let last_frame = stats.frames_read.saturating_sub(1);

        stats.tracks = store.len();
        stats.dormant_tracks = store.dormant(last_frame, self.config.dormant_after).len();
    }

    fn annotate_frame<C: Canvas + ?Sized>(
        &self,
        image: &mut C,
        store: &mut TrajectoryStore,
        frame: &Frame,
        fps: f32,
        stats: &mut RunStats,
    ) {
        let cfg = &self.config;
        let mut points = Vec::with_capacity(frame.len());

        trace!("frame {}: {} detections", frame.index, frame.len());

        for det in frame.iter() {
            if !det.is_valid() {
                debug!(
                    "frame {}: {}",
                    frame.index,
                    Error::InvalidDetection(det.bbox().into())
                );
                stats.invalid_detections += 1;
                continue;
            }

            let drawn = match det.track_id {
                Some(id) => {
                    let centroid = det.centroid();
                    let gap = store
                        .get(id)
                        .map_or(1, |t| frame.index.saturating_sub(t.last_seen).max(1));
                    let history = store.record(id, centroid, cfg.trajectory_capacity);
                    let speed = velocity::estimate(history, fps / gap as f32);
                    points.push((id, centroid));

                    self.annotator
                        .annotate(image, det, history, speed, cfg.velocity_threshold)
                        .map(|risk| {
                            if risk == Risk::High {
                                stats.high_risk_observations += 1;
                            }
                        })
                }
                None => {
                    stats.untracked_detections += 1;

                    if cfg.include_untracked_detections {
                        stats.untracked_drawn += 1;
                        self.annotator.annotate_untracked(image, det)
                    } else {
                        Ok(())
                    }
                }
            };

            if let Err(err) = drawn {
                warn!("frame {}: {}", frame.index, err);
                stats.draw_failures += 1;
            }
        }

        if let Some(distance) = cfg.collision_distance {
            for pair in collision::proximity_pairs(&points, distance) {
                debug!(
                    "frame {}: tracks {} and {} are {:.1}px apart",
                    frame.index, pair.a, pair.b, pair.distance
                );
                stats.proximity_events += 1;

                let a = points.iter().find(|(id, _)| *id == pair.a).map(|p| p.1);
                let b = points.iter().find(|(id, _)| *id == pair.b).map(|p| p.1);

                if let (Some(a), Some(b)) = (a, b) {
                    if let Err(err) = self.annotator.draw_link(image, a, b) {
                        warn!("frame {}: {}", frame.index, err);
                        stats.draw_failures += 1;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::TrackerParams;
    use crate::canvas::{Color, Raster};
    use crate::detection::Detection;
    use crate::video::{MemorySink, MemorySource};

    fn frames(k: usize) -> Vec<Raster> {
        (0..k)
            .map(|i| Raster::filled(64, 48, Color::rgb(i as u8, 0, 0)))
            .collect()
    }

    #[test]
    fn test_adapter_failure_passes_frame_through() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let source = MemorySource::new(10.0, 64, 48, frames(3));
        let original = frames(3);
        let mut sink = MemorySink::new();

        let mut adapter = |i: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> {
            if i == 1 {
                Err(Error::adapter(i, "inference failed"))
            } else {
                Ok(vec![Detection::tracked(1, 5.0, 5.0, 20.0, 20.0)])
            }
        };

        let stats = pipeline.process(source, &mut adapter, &mut sink).unwrap();

        assert_eq!(stats.frames_read, 3);
        assert_eq!(stats.frames_written, 3);
        assert_eq!(stats.adapter_failures, 1);
        assert_eq!(sink.frames[1], original[1]);
        assert_ne!(sink.frames[0], original[0]);
        assert!(sink.finished);
    }

    #[test]
    fn test_invalid_detection_is_counted_not_drawn() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let source = MemorySource::new(10.0, 64, 48, frames(1));
        let mut sink = MemorySink::new();

        let mut adapter = |_: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> {
            Ok(vec![Detection::tracked(1, 30.0, 5.0, 10.0, 20.0)])
        };

        let stats = pipeline.process(source, &mut adapter, &mut sink).unwrap();

        assert_eq!(stats.invalid_detections, 1);
        assert_eq!(stats.tracks, 0);
        assert_eq!(sink.frames[0], frames(1)[0]);
    }

    #[test]
    fn test_proximity_pairs_are_linked() {
        let cfg = Config {
            collision_distance: Some(20.0),
            ..Default::default()
        };
        let pipeline = Pipeline::new(cfg).unwrap();
        let source = MemorySource::new(25.0, 64, 48, frames(2));
        let mut sink = MemorySink::new();

        let mut adapter = |_: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> {
            Ok(vec![
                Detection::tracked(1, 0.0, 0.0, 10.0, 10.0),
                Detection::tracked(2, 10.0, 0.0, 20.0, 10.0),
                Detection::tracked(3, 40.0, 30.0, 60.0, 46.0),
            ])
        };

        let stats = pipeline.process(source, &mut adapter, &mut sink).unwrap();

        assert_eq!(stats.proximity_events, 2);
        assert_eq!(stats.tracks, 3);
    }

    #[test]
    fn test_cancel_before_first_frame() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        pipeline.cancel_token().cancel();

        let source = MemorySource::new(10.0, 64, 48, frames(4));
        let mut sink = MemorySink::new();
        let mut adapter =
            |_: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> { Ok(vec![]) };

        let res = pipeline.process(source, &mut adapter, &mut sink);

        match res {
            Err(Error::Cancelled {
                frames_written: 0,
                stats,
            }) => {
                assert!(stats.cancelled);
                assert_eq!(stats.frames_read, 0);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_cancel_mid_run_keeps_counters() {
        let pipeline = Pipeline::new(Config::default()).unwrap();
        let token = pipeline.cancel_token();

        let source = MemorySource::new(10.0, 64, 48, frames(6));
        let mut sink = MemorySink::new();
        let mut adapter = |i: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> {
            if i == 2 {
                token.cancel();
            }
            Ok(vec![Detection::tracked(4, 5.0, 5.0, 20.0, 20.0)])
        };

        match pipeline.process(source, &mut adapter, &mut sink) {
            Err(Error::Cancelled {
                frames_written,
                stats,
            }) => {
                assert_eq!(frames_written, 3);
                assert!(stats.cancelled);
                assert_eq!(stats.frames_read, 3);
                assert_eq!(stats.tracks, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(sink.frames.len(), 3);
        assert!(!sink.finished);
    }

    #[test]
    fn test_speed_spans_missed_frames() {
        let cfg = Config {
            velocity_threshold: 150.0,
            ..Default::default()
        };
        let pipeline = Pipeline::new(cfg).unwrap();
        let source = MemorySource::new(10.0, 64, 48, frames(4));
        let mut sink = MemorySink::new();

        // 10 px per frame at 10 fps is 100 px/s, frame 1 is lost
        let mut adapter = |i: usize, _: &Raster, _: &TrackerParams| -> Result<Vec<Detection>, Error> {
            if i == 1 {
                return Err(Error::adapter(i, "dropped"));
            }
            let x = 10.0 * i as f32;
            Ok(vec![Detection::tracked(2, x, 5.0, x + 10.0, 15.0)])
        };

        let stats = pipeline.process(source, &mut adapter, &mut sink).unwrap();

        assert_eq!(stats.adapter_failures, 1);
        assert_eq!(stats.high_risk_observations, 0);
    }

    #[test]
    fn test_unreadable_font_is_a_config_error() {
        let cfg = Config {
            font_path: Some("/nonexistent/label.ttf".into()),
            ..Default::default()
        };

        assert!(matches!(Pipeline::new(cfg), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = Config {
            trajectory_capacity: 0,
            ..Default::default()
        };

        assert!(matches!(Pipeline::new(cfg), Err(Error::Config(_))));
    }
}
