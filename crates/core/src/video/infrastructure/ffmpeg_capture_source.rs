use std::path::PathBuf;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::capture_source::CaptureSource;

/// Where frames come from.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureInput {
    /// A camera opened through an ffmpeg input device, e.g. `/dev/video0`
    /// with `v4l2`, `0` with `avfoundation`, `video=Cam` with `dshow`.
    Device {
        name: String,
        /// Input device format; the platform default when `None`.
        format: Option<String>,
    },
    /// A recorded video file or stream URL, mostly for replaying sessions.
    File(PathBuf),
}

impl CaptureInput {
    fn describe(&self) -> String {
        match self {
            CaptureInput::Device { name, format } => format!(
                "{} device {name}",
                format.as_deref().unwrap_or(default_device_format())
            ),
            CaptureInput::File(path) => path.display().to_string(),
        }
    }
}

/// Platform input device format used when none is configured.
pub fn default_device_format() -> &'static str {
    if cfg!(target_os = "macos") {
        "avfoundation"
    } else if cfg!(target_os = "windows") {
        "dshow"
    } else {
        "v4l2"
    }
}

/// Reads frames from a camera or video file via ffmpeg-next.
///
/// Every decoded frame is converted to RGB24 and scaled to the configured
/// output size, so the rest of the pipeline never sees the device format.
pub struct FfmpegCaptureSource {
    input: CaptureInput,
    options: Vec<(String, String)>,
    width: u32,
    height: u32,
    fps: f64,
    state: Option<DecodeState>,
}

struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    frame_index: usize,
    flushing: bool,
}

// Safety: FfmpegCaptureSource is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegCaptureSource {}

impl FfmpegCaptureSource {
    pub fn new(input: CaptureInput, width: u32, height: u32, fps: f64) -> Self {
        Self {
            input,
            options: Vec::new(),
            width,
            height,
            fps,
            state: None,
        }
    }

    /// Extra demuxer/device options such as `video_size` or `framerate`.
    pub fn with_options(mut self, options: Vec<(String, String)>) -> Self {
        self.options = options;
        self
    }

    fn open_input(&self) -> Result<ffmpeg_next::format::context::Input, Box<dyn std::error::Error>> {
        let mut dict = ffmpeg_next::Dictionary::new();
        for (key, value) in &self.options {
            dict.set(key, value);
        }

        match &self.input {
            CaptureInput::File(path) => Ok(ffmpeg_next::format::input_with_dictionary(path, dict)?),
            CaptureInput::Device { name, format } => {
                ffmpeg_next::device::register_all();
                let wanted = format.as_deref().unwrap_or(default_device_format());
                let device_format = ffmpeg_next::device::input::video()
                    .find(|f| f.name() == wanted)
                    .ok_or_else(|| format!("ffmpeg input device format '{wanted}' not available"))?;
                let ctx = ffmpeg_next::format::open_with(
                    name,
                    &ffmpeg_next::format::Format::Input(device_format),
                    dict,
                )?;
                Ok(ctx.input())
            }
        }
    }
}

impl Drop for FfmpegCaptureSource {
    fn drop(&mut self) {
        self.close();
    }
}

impl CaptureSource for FfmpegCaptureSource {
    fn open(&mut self) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = self.open_input()?;
        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;
        let stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg_next::format::Pixel::RGB24,
            self.width,
            self.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Opened {} ({}x{}, scaling to {}x{})",
            self.input.describe(),
            decoder.width(),
            decoder.height(),
            self.width,
            self.height
        );

        self.state = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            stream_index,
            frame_index: 0,
            flushing: false,
        });

        Ok(VideoMetadata {
            width: self.width,
            height: self.height,
            fps: self.fps,
            source: Some(self.input.describe()),
        })
    }

    fn read(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let (width, height) = (self.width, self.height);
        let state = self
            .state
            .as_mut()
            .ok_or("FfmpegCaptureSource: not opened")?;

        loop {
            if let Some(frame) = state.try_receive(width, height)? {
                return Ok(Some(frame));
            }
            if state.flushing {
                return Ok(None);
            }

            match state.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() != state.stream_index {
                        continue;
                    }
                    if let Err(e) = state.decoder.send_packet(&packet) {
                        log::debug!("Dropping undecodable packet: {e}");
                    }
                }
                None => {
                    let _ = state.decoder.send_eof();
                    state.flushing = true;
                }
            }
        }
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed {}", self.input.describe());
        }
    }
}

impl DecodeState {
    fn try_receive(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let pixels = extract_rgb_pixels(&rgb_frame, width, height);
        let frame = Frame::new(pixels, width, height, 3, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

/// Copies RGB24 rows out of an ffmpeg frame, dropping stride padding.
fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
