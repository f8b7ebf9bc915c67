use std::io::Cursor;

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, ImageFormat};
use tracing::debug;

use crate::duration::RemainingDuration;
use crate::error_codes::Result;
use crate::renderer::Frame;

pub const DEFAULT_MAX_FRAMES: u32 = 60;
pub const FRAME_DELAY_MS: u32 = 1_000;
/// NeuQuant sampling factor; 1 is best quality, 30 fastest.
const GIF_QUANTIZER_SPEED: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Still,
    Animated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    StillImage,
    AnimatedLoop,
}

impl MediaType {
    pub fn content_type(self) -> &'static str {
        match self {
            Self::StillImage => "image/png",
            Self::AnimatedLoop => "image/gif",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderedCountdown {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    pub frame_count: u32,
}

/// Remaining-time snapshots one second apart, counted down from a single
/// starting value. Ends after the zero frame or after `max_frames`.
#[derive(Debug, Clone)]
pub struct CountdownFrames {
    next_total: i64,
    emitted: u32,
    max_frames: u32,
    finished: bool,
}

impl CountdownFrames {
    pub fn new(start: &RemainingDuration, max_frames: u32) -> Self {
        Self {
            next_total: start.total_seconds(),
            emitted: 0,
            max_frames,
            finished: max_frames == 0,
        }
    }
}

impl Iterator for CountdownFrames {
    type Item = RemainingDuration;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let current = RemainingDuration::from_total_seconds(self.next_total);
        self.emitted += 1;
        if current.expired || self.emitted >= self.max_frames {
            self.finished = true;
        }
        self.next_total -= 1;
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            return (0, Some(0));
        }
        let by_cap = (self.max_frames - self.emitted) as usize;
        let by_time = self.next_total.max(0) as usize + 1;
        let left = by_cap.min(by_time);
        (left, Some(left))
    }
}

/// Renders `start` (still) or the countdown sequence from `start` (animated)
/// and encodes it. Animated frames are handed to the GIF encoder as soon as
/// they are rendered, in generation order.
pub fn encode<F>(
    start: &RemainingDuration,
    mut render_one: F,
    mode: RenderMode,
    max_frames: u32,
) -> Result<RenderedCountdown>
where
    F: FnMut(&RemainingDuration) -> Result<Frame>,
{
    match mode {
        RenderMode::Still => {
            let frame = render_one(start)?;
            Ok(RenderedCountdown {
                bytes: encode_png(frame)?,
                media_type: MediaType::StillImage,
                frame_count: 1,
            })
        }
        RenderMode::Animated => {
            let mut bytes = Vec::new();
            let mut frame_count = 0;
            {
                let mut encoder = GifEncoder::new_with_speed(&mut bytes, GIF_QUANTIZER_SPEED);
                encoder.set_repeat(Repeat::Infinite)?;
                for remaining in CountdownFrames::new(start, max_frames.max(1)) {
                    let frame = render_one(&remaining)?;
                    let delay = Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1);
                    encoder.encode_frame(image::Frame::from_parts(
                        frame.into_rgba_image()?,
                        0,
                        0,
                        delay,
                    ))?;
                    frame_count += 1;
                }
            }
            debug!(frame_count, bytes = bytes.len(), "encoded animated countdown");
            Ok(RenderedCountdown {
                bytes,
                media_type: MediaType::AnimatedLoop,
                frame_count,
            })
        }
    }
}

pub fn encode_png(frame: Frame) -> Result<Vec<u8>> {
    let image = frame.into_rgba_image()?;
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png)?;
    Ok(cursor.into_inner())
}
