//! V4L2 webcam source (feature `ingest-v4l2`)

use std::io::ErrorKind;
use std::time::Duration;

use ouroboros::self_referencing;
use tracing::{info, warn};

use crate::{CameraConfig, CameraError, FrameSource, VideoFrame};

#[self_referencing]
struct StreamState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WireFormat {
    Rgb24,
    Mjpeg,
}

/// Local webcam identified by index
pub struct V4l2Source {
    config: CameraConfig,
    device_path: String,
    state: Option<StreamState>,
    format: WireFormat,
    width: u32,
    height: u32,
    sequence: u32,
}

impl V4l2Source {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            device_path: config.device_path(),
            width: config.width,
            height: config.height,
            config,
            state: None,
            format: WireFormat::Rgb24,
            sequence: 0,
        }
    }
}

impl FrameSource for V4l2Source {
    fn name(&self) -> &str {
        &self.device_path
    }

    fn open(&mut self) -> Result<(), CameraError> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let unavailable = |e: std::io::Error| CameraError::DeviceUnavailable(e.to_string());

        let device = v4l::Device::with_path(&self.device_path).map_err(unavailable)?;
        let mut format = device.format().map_err(unavailable)?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(f) => f,
            Err(e) => {
                warn!(device = %self.device_path, "Failed to set RGB3 format: {}", e);
                device.format().map_err(unavailable)?
            }
        };

        self.format = if &format.fourcc.repr == b"MJPG" {
            WireFormat::Mjpeg
        } else if &format.fourcc.repr == b"RGB3" {
            WireFormat::Rgb24
        } else {
            return Err(CameraError::Format(format!("unsupported fourcc {}", format.fourcc)));
        };

        if self.config.fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.fps);
            if let Err(e) = device.set_params(&params) {
                warn!(device = %self.device_path, "Failed to set fps: {}", e);
            }
        }

        self.width = format.width;
        self.height = format.height;

        // A stalled device surfaces as a timed-out read instead of blocking
        let timeout = Duration::from_millis(self.config.read_timeout_ms());
        let state = StreamStateTryBuilder {
            device,
            stream_builder: |device| {
                let mut stream = v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)?;
                stream.set_timeout(timeout);
                Ok(stream)
            },
        }
        .try_build()
        .map_err(unavailable)?;
        self.state = Some(state);

        info!(device = %self.device_path, width = self.width, height = self.height, "V4L2 stream started");
        Ok(())
    }

    fn next_frame(&mut self) -> Result<VideoFrame, CameraError> {
        use v4l::io::traits::CaptureStream;

        let state = self.state.as_mut().ok_or(CameraError::NotOpen)?;
        let timeout_ms = self.config.read_timeout_ms();
        let (buf, meta) = state
            .with_mut(|fields| fields.stream.next())
            .map_err(|e| read_error(e, timeout_ms))?;

        let timestamp_ns = (meta.timestamp.sec as u64) * 1_000_000_000 + (meta.timestamp.usec as u64) * 1_000;
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);

        match self.format {
            WireFormat::Rgb24 => {
                let expected = (self.width * self.height * 3) as usize;
                let data = buf.get(..expected).ok_or_else(|| {
                    CameraError::FrameRead(format!("short buffer: {} < {}", buf.len(), expected))
                })?;
                VideoFrame::new(data.to_vec(), self.width, self.height, timestamp_ns, sequence)
            }
            WireFormat::Mjpeg => VideoFrame::decode_jpeg(buf, timestamp_ns, sequence),
        }
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            info!(device = %self.device_path, "V4L2 stream stopped");
        }
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }
}

fn read_error(e: std::io::Error, timeout_ms: u64) -> CameraError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => CameraError::Timeout(timeout_ms),
        _ => CameraError::FrameRead(e.to_string()),
    }
}
