use log::info;
use nalgebra as na;
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio,
};
use std::path::Path;

use crate::canvas::{Canvas, Color};
use crate::error::Error;
use crate::video::{VideoMeta, VideoSink, VideoSource};

#[inline]
fn scalar(color: Color) -> core::Scalar {
    let [b, g, r] = color.bgr();

    core::Scalar::new(b as f64, g as f64, r as f64, 255.0)
}

#[inline]
fn point(p: na::Point2<i32>) -> core::Point {
    core::Point::new(p.x, p.y)
}

impl Canvas for Mat {
    fn dims(&self) -> (u32, u32) {
        (self.cols().max(0) as u32, self.rows().max(0) as u32)
    }

    fn line(
        &mut self,
        from: na::Point2<i32>,
        to: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error> {
        imgproc::line(
            self,
            point(from),
            point(to),
            scalar(color),
            thickness,
            imgproc::LINE_AA,
            0,
        )?;

        Ok(())
    }

    fn rectangle(
        &mut self,
        top_left: na::Point2<i32>,
        bottom_right: na::Point2<i32>,
        color: Color,
        thickness: i32,
    ) -> Result<(), Error> {
        let rect = core::Rect::new(
            top_left.x,
            top_left.y,
            bottom_right.x.saturating_sub(top_left.x),
            bottom_right.y.saturating_sub(top_left.y),
        );

        imgproc::rectangle(self, rect, scalar(color), thickness, imgproc::LINE_8, 0)?;

        Ok(())
    }

    fn text(
        &mut self,
        origin: na::Point2<i32>,
        text: &str,
        color: Color,
        scale: f32,
    ) -> Result<(), Error> {
        imgproc::put_text(
            self,
            text,
            point(origin),
            imgproc::FONT_HERSHEY_SIMPLEX,
            scale as f64,
            scalar(color),
            2,
            imgproc::LINE_AA,
            false,
        )?;

        Ok(())
    }
}

/// Resizes `frame` to `side x side` for inference. Also returns the factors
/// mapping boxes found on the resized image back onto `frame`.
pub fn resize_square(frame: &Mat, side: u32) -> Result<(Mat, (f32, f32)), Error> {
    let mut resized = Mat::default();
    let side = side.max(1) as i32;

    imgproc::resize(
        frame,
        &mut resized,
        core::Size::new(side, side),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    let sx = frame.cols() as f32 / side as f32;
    let sy = frame.rows() as f32 / side as f32;

    Ok((resized, (sx, sy)))
}

pub struct VideoCaptureSource {
    cap: videoio::VideoCapture,
    meta: VideoMeta,
}

impl VideoCaptureSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_string_lossy().to_string();

        let mut cap = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)
            .map_err(|err| Error::SourceUnavailable(format!("{}: {}", path, err)))?;

        if !videoio::VideoCapture::is_opened(&cap)? {
            return Err(Error::SourceUnavailable(format!("unable to open {}", path)));
        }

        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let fps = cap.get(videoio::CAP_PROP_FPS)? as f32;
        let total = cap.get(videoio::CAP_PROP_FRAME_COUNT)?;

        info!("video {}: {}x{} @ {} fps, {} frames", path, width, height, fps, total);

        Ok(Self {
            cap,
            meta: VideoMeta {
                fps,
                width,
                height,
                frame_count: if total > 0.0 {
                    Some(total as usize)
                } else {
                    None
                },
            },
        })
    }
}

impl VideoSource for VideoCaptureSource {
    type Image = Mat;

    #[inline]
    fn meta(&self) -> VideoMeta {
        self.meta
    }

    fn read(&mut self) -> Result<Option<Mat>, Error> {
        let mut frame = Mat::default();

        if !self.cap.read(&mut frame)? {
            return Ok(None);
        }

        if frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }
}

pub struct VideoWriterSink {
    writer: Option<videoio::VideoWriter>,
    size: (i32, i32),
    written: usize,
    out_file: String,
}

impl VideoWriterSink {
    /// Opens `out_file` for `mp4v` encoding with the source dimensions and rate.
    pub fn create<P: AsRef<Path>>(out_file: P, meta: &VideoMeta) -> Result<Self, Error> {
        let out_file = out_file.as_ref().to_string_lossy().to_string();
        let size = (meta.width as i32, meta.height as i32);

        let writer = videoio::VideoWriter::new(
            &out_file,
            videoio::VideoWriter::fourcc(b'm' as _, b'p' as _, b'4' as _, b'v' as _)?,
            meta.fps as f64,
            core::Size::new(size.0, size.1),
            true,
        )
        .map_err(|err| Error::sink(0, format!("{}: {}", out_file, err)))?;

        if !writer.is_opened().map_err(|err| Error::sink(0, err))? {
            return Err(Error::sink(0, format!("unable to create {}", out_file)));
        }

        Ok(Self {
            writer: Some(writer),
            size,
            written: 0,
            out_file,
        })
    }

    pub fn release(&mut self) -> Result<(), Error> {
        if let Some(mut w) = self.writer.take() {
            w.release().map_err(|err| Error::sink(self.written, err))?;
        }

        Ok(())
    }
}

impl VideoSink<Mat> for VideoWriterSink {
    fn write(&mut self, image: &Mat) -> Result<(), Error> {
        let size = (image.cols(), image.rows());

        if size != self.size {
            return Err(Error::sink(
                self.written,
                format!("frame size {:?} differs from {:?}", size, self.size),
            ));
        }

        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::sink(self.written, format!("{} already released", self.out_file)))?;

        writer
            .write(image)
            .map_err(|err| Error::sink(self.written, err))?;
        self.written += 1;

        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.release()
    }
}

impl Drop for VideoWriterSink {
    fn drop(&mut self) {
        if let Some(mut w) = self.writer.take() {
            let _ = w.release();
        }
    }
}
