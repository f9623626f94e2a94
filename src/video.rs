use std::collections::VecDeque;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoMeta {
    pub fps: f32,
    pub width: u32,
    pub height: u32,
    pub frame_count: Option<usize>,
}

/// Sequential frame reader. `meta` is available before the first `read`.
pub trait VideoSource {
    type Image;

    fn meta(&self) -> VideoMeta;

    /// `Ok(None)` at end of stream.
    fn read(&mut self) -> Result<Option<Self::Image>, Error>;
}

/// Sequential frame writer, frames are stored in the order they are written.
pub trait VideoSink<I: ?Sized> {
    fn write(&mut self, image: &I) -> Result<(), Error>;

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Frames held in memory.
#[derive(Debug, Clone)]
pub struct MemorySource<I> {
    meta: VideoMeta,
    frames: VecDeque<I>,
}

impl<I> MemorySource<I> {
    pub fn new(fps: f32, width: u32, height: u32, frames: Vec<I>) -> Self {
        Self {
            meta: VideoMeta {
                fps,
                width,
                height,
                frame_count: Some(frames.len()),
            },
            frames: frames.into(),
        }
    }
}

impl<I> VideoSource for MemorySource<I> {
    type Image = I;

    #[inline]
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    #[inline]
    fn read(&mut self) -> Result<Option<I>, Error> {
        Ok(self.frames.pop_front())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySink<I> {
    pub frames: Vec<I>,
    pub finished: bool,
}

impl<I> MemorySink<I> {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            finished: false,
        }
    }
}

impl<I: Clone> VideoSink<I> for MemorySink<I> {
    #[inline]
    fn write(&mut self, image: &I) -> Result<(), Error> {
        self.frames.push(image.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.finished = true;
        Ok(())
    }
}
