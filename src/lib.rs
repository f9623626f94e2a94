pub mod adapter;
pub mod annotator;
pub mod bbox;
pub mod canvas;
pub mod collision;
pub mod config;
pub mod detection;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod trajectory;
pub mod velocity;
pub mod video;

#[cfg(feature = "opencv")]
pub mod opencv_io;

mod circular_queue;
mod track;

pub use adapter::{DetectionLog, TrackerAdapter, TrackerKind, TrackerParams};
pub use annotator::{Annotator, Style};
pub use canvas::{load_font, Canvas, Color, Raster};
pub use config::Config;
pub use detection::Detection;
pub use error::Error;
pub use frame::Frame;
pub use pipeline::{CancelToken, Pipeline, RunStats};
pub use track::{Centroid, Track};
pub use trajectory::TrajectoryStore;
pub use velocity::Risk;
pub use video::{MemorySink, MemorySource, VideoMeta, VideoSink, VideoSource};

/// Identity assigned by the external tracker, stable for the lifetime of an object.
pub type TrackId = u32;

#[cfg(feature = "opencv")]
pub fn process_file<P, Q, A>(
    pipeline: &Pipeline,
    input: P,
    adapter: &mut A,
    output: Q,
) -> Result<RunStats, Error>
where
    P: AsRef<std::path::Path>,
    Q: AsRef<std::path::Path>,
    A: TrackerAdapter<opencv::core::Mat> + ?Sized,
{
    let (_, stats) = pipeline.run(
        || opencv_io::VideoCaptureSource::open(input),
        adapter,
        |meta| opencv_io::VideoWriterSink::create(output, meta),
    )?;

    Ok(stats)
}
