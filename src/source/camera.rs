//! V4L2 camera source.
//!
//! Requests MJPEG frames from `/dev/video<N>` and decodes each one to RGB.

use super::FrameSource;
use crate::error::MonitorError;
use image::RgbImage;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

const BUFFER_COUNT: u32 = 4;

/// Live frames from a capture device
pub struct CameraSource {
    stream: Stream<'static>,
}

impl CameraSource {
    pub fn open(index: u32) -> Result<Self, MonitorError> {
        let device = Device::new(index as usize)?;

        let mut format = device.format()?;
        format.fourcc = FourCC::new(b"MJPG");
        let format = device.set_format(&format)?;
        if format.fourcc != FourCC::new(b"MJPG") {
            return Err(MonitorError::UnsupportedSource(format!(
                "device {index} does not support MJPEG capture"
            )));
        }

        let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;
        tracing::info!(
            device = index,
            width = format.width,
            height = format.height,
            "Opened camera"
        );
        Ok(Self { stream })
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Option<RgbImage> {
        let (data, _meta) = match self.stream.next() {
            Ok(buffer) => buffer,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read camera frame, ending stream");
                return None;
            }
        };
        match image::load_from_memory_with_format(data, image::ImageFormat::Jpeg) {
            Ok(frame) => Some(frame.to_rgb8()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode camera frame, ending stream");
                None
            }
        }
    }
}
