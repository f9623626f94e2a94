use log::trace;
use serde_derive::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

use crate::detection::Detection;
use crate::error::Error;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    #[serde(alias = "bytetrack", alias = "bytetrack.yaml")]
    ByteTrack,
    #[serde(alias = "botsort", alias = "botsort.yaml")]
    BotSort,
}

/// Tuning handed to the external detector/tracker on every call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TrackerParams {
    pub confidence: f32,
    pub iou: f32,
    pub tracker: TrackerKind,

    /// Square side frames are resized to before inference. Adapters honoring it
    /// still report boxes in source frame pixels.
    pub inference_resolution: Option<u32>,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            confidence: 0.3,
            iou: 0.5,
            tracker: TrackerKind::ByteTrack,
            inference_resolution: None,
        }
    }
}

impl TrackerParams {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::Config(format!(
                "tracker.confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }

        if !(0.0..=1.0).contains(&self.iou) {
            return Err(Error::Config(format!(
                "tracker.iou must be within [0, 1], got {}",
                self.iou
            )));
        }

        if self.inference_resolution == Some(0) {
            return Err(Error::Config(
                "tracker.inference_resolution must be positive".into(),
            ));
        }

        Ok(())
    }
}

/// Detector plus multi-object tracker, seen as a black box.
///
/// Called once per frame, in frame order. A returned error only affects the
/// frame it was raised for.
pub trait TrackerAdapter<I: ?Sized> {
    fn track(
        &mut self,
        index: usize,
        image: &I,
        params: &TrackerParams,
    ) -> Result<Vec<Detection>, Error>;
}

impl<I, F> TrackerAdapter<I> for F
where
    I: ?Sized,
    F: FnMut(usize, &I, &TrackerParams) -> Result<Vec<Detection>, Error>,
{
    #[inline]
    fn track(
        &mut self,
        index: usize,
        image: &I,
        params: &TrackerParams,
    ) -> Result<Vec<Detection>, Error> {
        self(index, image, params)
    }
}

/// Replays a recorded detection dump, one frame per line:
///
/// ```text
/// <offset ms>: [{"x1":..,"y1":..,"x2":..,"y2":..,"id":..,"p":..,"c":..}, ...]
/// ```
pub struct DetectionLog<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl DetectionLog<std::io::BufReader<std::fs::File>> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;

        Ok(Self::new(std::io::BufReader::new(file)))
    }
}

impl<R: BufRead> DetectionLog<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Next frame's offset in ms and its detections.
    pub fn next_frame(&mut self) -> Option<Result<(u64, Vec<Detection>), String>> {
        let line = self.lines.next()?;
        self.line_no += 1;

        let line = match line {
            Ok(line) => line,
            Err(err) => return Some(Err(format!("line {}: {}", self.line_no, err))),
        };

        Some(parse_line(&line).map_err(|err| format!("line {}: {}", self.line_no, err)))
    }
}

fn parse_line(line: &str) -> Result<(u64, Vec<Detection>), String> {
    let idx = line
        .find(':')
        .ok_or_else(|| "wrong file format: expected `:`".to_string())?;
    let (ts, vector) = line.split_at(idx);

    let ts = ts
        .trim()
        .parse::<u64>()
        .map_err(|err| format!("wrong file format: parse timestamp failed: {}", err))?;
    let dets = serde_json::from_str(&vector[1..])
        .map_err(|err| format!("wrong file format: parse json failed: {}", err))?;

    Ok((ts, dets))
}

impl<I: ?Sized, R: BufRead> TrackerAdapter<I> for DetectionLog<R> {
    fn track(
        &mut self,
        index: usize,
        _image: &I,
        _params: &TrackerParams,
    ) -> Result<Vec<Detection>, Error> {
        match self.next_frame() {
            Some(Ok((ts, dets))) => {
                trace!("frame {}: {} detections at {} ms", index, dets.len(), ts);
                Ok(dets)
            }
            Some(Err(reason)) => Err(Error::adapter(index, reason)),
            None => Err(Error::adapter(index, "detection log exhausted")),
        }
    }
}
