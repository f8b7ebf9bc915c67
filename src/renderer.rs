use std::collections::HashMap;
use std::sync::Arc;

use image::RgbaImage;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::duration::RemainingDuration;
use crate::error_codes::{CountdownError, Result};
use crate::font_assets::{FontSet, GlyphBitmap, GlyphKey, TextRun, Typeface};
use crate::layout::{BoxBounds, ScoreboardGeometry, BOX_MARGIN_X};
use crate::palette::{Palette, Rgba8};

pub const COLUMN_LABELS: [&str; 4] = ["DIAS", "HORAS", "MINUTOS", "SEGUNDOS"];

/// One rendered scoreboard raster.
pub struct Frame {
    pixmap: Pixmap,
}

impl Frame {
    pub fn solid(width: u32, height: u32, color: Rgba8) -> Result<Self> {
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            CountdownError::Render(format!("failed to allocate {width}x{height} canvas"))
        })?;
        pixmap.fill(to_skia(color));
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        let color = self.pixmap.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn into_rgba_image(self) -> Result<RgbaImage> {
        let (width, height) = (self.width(), self.height());
        let data = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|pixel| {
                let color = pixel.demultiply();
                [color.red(), color.green(), color.blue(), color.alpha()]
            })
            .collect::<Vec<_>>();
        RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            CountdownError::Render(format!("frame buffer does not match {width}x{height}"))
        })
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

/// Draws scoreboard frames for one request. Palette, fonts and geometry are
/// fixed for the renderer's lifetime; only rasterized glyphs are memoized.
pub struct FrameRenderer {
    palette: Palette,
    fonts: FontSet,
    geometry: ScoreboardGeometry,
    expired_message: Option<String>,
    glyph_cache: HashMap<GlyphKey, GlyphBitmap>,
}

impl FrameRenderer {
    pub fn new(palette: Palette, fonts: FontSet, geometry: ScoreboardGeometry) -> Self {
        Self {
            palette,
            fonts,
            geometry,
            expired_message: None,
            glyph_cache: HashMap::new(),
        }
    }

    /// Replaces the all-zero scoreboard with `message` once the deadline passed.
    pub fn with_expired_message(mut self, message: Option<String>) -> Self {
        self.expired_message = message.filter(|text| !text.trim().is_empty());
        self
    }

    pub fn render(&mut self, remaining: &RemainingDuration) -> Result<Frame> {
        let mut frame = Frame::solid(
            self.geometry.width,
            self.geometry.height,
            self.palette.background,
        )?;

        if remaining.expired {
            if let Some(message) = self.expired_message.clone() {
                self.draw_expired_message(&mut frame, &message);
                return Ok(frame);
            }
        }

        let mut box_paint = Paint::default();
        box_paint.set_color(to_skia(self.palette.box_fill));
        box_paint.anti_alias = true;

        let numeral_face = Arc::clone(&self.fonts.numeral);
        let label_face = Arc::clone(&self.fonts.label);
        let columns = self.geometry.columns.clone();

        for ((column, value), label) in columns.iter().zip(remaining.columns()).zip(COLUMN_LABELS) {
            if let Some(path) = rounded_rect(&column.bounds, column.corner_radius) {
                frame.pixmap.fill_path(
                    &path,
                    &box_paint,
                    FillRule::Winding,
                    Transform::identity(),
                    None,
                );
            }

            // Days past 99 keep every digit even if they spill out of the box.
            let digits = format!("{value:02}");
            let run = numeral_face.shape(&digits);
            if let Some(ink) = run.ink {
                let band_center = (column.numeral_top + column.numeral_bottom) * 0.5;
                let origin_x = column.center_x - ink.center_x();
                let origin_y = band_center - ink.center_y();
                self.draw_run(&mut frame, &numeral_face, &run, origin_x, origin_y);
            }

            let run = label_face.shape(label);
            if let Some(ink) = run.ink {
                let origin_x = column.center_x - ink.center_x();
                let origin_y = column.label_baseline - ink.max_y;
                self.draw_run(&mut frame, &label_face, &run, origin_x, origin_y);
            }
        }

        Ok(frame)
    }

    fn draw_expired_message(&mut self, frame: &mut Frame, message: &str) {
        let available = self.geometry.width as f32 - 2.0 * BOX_MARGIN_X;
        let numeral_face = Arc::clone(&self.fonts.numeral);
        let label_face = Arc::clone(&self.fonts.label);

        let numeral_run = numeral_face.shape(message);
        let (face, run) = match numeral_run.ink {
            Some(ink) if ink.width() <= available => (numeral_face, numeral_run),
            _ => {
                let run = label_face.shape(message);
                (label_face, run)
            }
        };

        if let Some(ink) = run.ink {
            let origin_x = self.geometry.width as f32 * 0.5 - ink.center_x();
            let origin_y = self.geometry.height as f32 * 0.5 - ink.center_y();
            self.draw_run(frame, &face, &run, origin_x, origin_y);
        }
    }

    fn draw_run(&mut self, frame: &mut Frame, face: &Typeface, run: &TextRun, x: f32, y: f32) {
        let (width, height) = (frame.width(), frame.height());
        let color = self.palette.digit_color;
        let data = frame.pixmap.data_mut();

        for glyph in &run.glyphs {
            if glyph.width == 0 || glyph.height == 0 {
                continue;
            }
            let bitmap = self
                .glyph_cache
                .entry(glyph.key)
                .or_insert_with(|| face.rasterize(glyph.key));

            blend_glyph(
                data,
                width,
                height,
                (x + glyph.x).round() as i32,
                (y + glyph.y).round() as i32,
                bitmap,
                color,
            );
        }
    }
}

fn to_skia(color: Rgba8) -> Color {
    Color::from_rgba8(color[0], color[1], color[2], color[3])
}

fn rounded_rect(bounds: &BoxBounds, radius: f32) -> Option<tiny_skia::Path> {
    if bounds.width <= 0.0 || bounds.height <= 0.0 {
        return None;
    }
    let (x, y, right, bottom) = (bounds.x, bounds.y, bounds.right(), bounds.bottom());
    let r = radius.max(0.0).min(bounds.width * 0.5).min(bounds.height * 0.5);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.quad_to(right, y, right, y + r);
    pb.line_to(right, bottom - r);
    pb.quad_to(right, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.quad_to(x, bottom, x, bottom - r);
    pb.line_to(x, y + r);
    pb.quad_to(x, y, x + r, y);
    pb.close();
    pb.finish()
}

/// Alpha-blends a coverage mask onto an opaque RGBA buffer.
pub fn blend_glyph(
    frame: &mut [u8],
    frame_width: u32,
    frame_height: u32,
    x: i32,
    y: i32,
    glyph: &GlyphBitmap,
    color: Rgba8,
) {
    for row in 0..glyph.height {
        let py = y + row as i32;
        if py < 0 || py >= frame_height as i32 {
            continue;
        }

        for col in 0..glyph.width {
            let px = x + col as i32;
            if px < 0 || px >= frame_width as i32 {
                continue;
            }

            let mask = glyph.bitmap[row * glyph.width + col];
            if mask == 0 {
                continue;
            }

            let alpha = ((u16::from(mask) * u16::from(color[3])) / 255) as u8;
            let idx = ((py as u32 * frame_width + px as u32) * 4) as usize;
            blend_pixel(frame, idx, [color[0], color[1], color[2], alpha]);
        }
    }
}

pub fn blend_pixel(frame: &mut [u8], idx: usize, src: Rgba8) {
    let alpha = u16::from(src[3]);
    if alpha == 0 {
        return;
    }

    let inv_alpha = 255_u16.saturating_sub(alpha);

    for channel in 0..3 {
        let dst = u16::from(frame[idx + channel]);
        let src_c = u16::from(src[channel]);
        frame[idx + channel] = ((src_c * alpha + dst * inv_alpha + 127) / 255) as u8;
    }
    frame[idx + 3] = 255;
}
