use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::encoding::DEFAULT_MAX_FRAMES;
use crate::font_assets::{default_candidates, FontCandidate};
use crate::layout::{BOX_HEIGHT, BOX_MARGIN_TOP, COLUMN_COUNT};

pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5000";
pub const MAX_CANVAS_SIDE: u32 = 4096;
pub const MAX_FRAMES_LIMIT: u32 = 600;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CountdownConfig {
    pub timezone: String,
    pub listen: String,
    pub workers: usize,
    pub canvas: Canvas,
    pub max_frames: u32,
    pub expired_message: Option<String>,
    pub static_dir: PathBuf,
    pub fonts: FontConfig,
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            timezone: DEFAULT_TIMEZONE.to_owned(),
            listen: DEFAULT_LISTEN.to_owned(),
            workers: 4,
            canvas: Canvas::default(),
            max_frames: DEFAULT_MAX_FRAMES,
            expired_message: None,
            static_dir: PathBuf::from("static"),
            fonts: FontConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            width: 600,
            height: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FontConfig {
    pub asset_root: PathBuf,
    pub numeral_size: f32,
    pub label_size: f32,
    pub candidates: Vec<FontCandidate>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("."),
            numeral_size: 64.0,
            label_size: 16.0,
            candidates: default_candidates(),
        }
    }
}

impl CountdownConfig {
    pub fn validate(&self) -> Result<()> {
        self.tz()?;

        if self.workers == 0 {
            bail!("workers must be >= 1");
        }

        let Canvas { width, height } = self.canvas;
        if width < COLUMN_COUNT as u32 || height == 0 {
            bail!("canvas must be at least {COLUMN_COUNT}x1, got {width}x{height}");
        }
        if width > MAX_CANVAS_SIDE || height > MAX_CANVAS_SIDE {
            bail!("canvas sides must be <= {MAX_CANVAS_SIDE}, got {width}x{height}");
        }
        let min_height = (BOX_MARGIN_TOP + BOX_HEIGHT) as u32;
        if height < min_height {
            bail!("canvas height must be >= {min_height} to fit the boxes, got {height}");
        }

        if !(1..=MAX_FRAMES_LIMIT).contains(&self.max_frames) {
            bail!(
                "max_frames must be within 1..={MAX_FRAMES_LIMIT}, got {}",
                self.max_frames
            );
        }

        validate_font_size("fonts.numeral_size", self.fonts.numeral_size)?;
        validate_font_size("fonts.label_size", self.fonts.label_size)?;

        for candidate in &self.fonts.candidates {
            if let Some(hash) = &candidate.sha256 {
                let hash = hash.trim();
                if hash.len() != 64 || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
                    bail!(
                        "font candidate '{}' sha256 must be 64 hex characters",
                        candidate.path.display()
                    );
                }
            }
        }

        Ok(())
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!("unknown timezone '{}'", self.timezone))
    }
}

fn validate_font_size(field: &str, value: f32) -> Result<()> {
    let max = MAX_CANVAS_SIDE as f32;
    if !value.is_finite() || value <= 0.0 || value > max {
        bail!("{field} must be > 0 and <= {max}, got {value}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CountdownConfig::default();
        config.validate().unwrap();
        assert_eq!(config.tz().unwrap(), chrono_tz::America::Sao_Paulo);
        assert_eq!(config.canvas, Canvas { width: 600, height: 150 });
        assert_eq!(config.max_frames, 60);
        assert!(config.expired_message.is_none());
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = CountdownConfig {
            timezone: "Mars/Olympus".to_owned(),
            ..CountdownConfig::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("Mars/Olympus"));
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let cases = [
            CountdownConfig {
                max_frames: 0,
                ..CountdownConfig::default()
            },
            CountdownConfig {
                max_frames: 601,
                ..CountdownConfig::default()
            },
            CountdownConfig {
                workers: 0,
                ..CountdownConfig::default()
            },
            CountdownConfig {
                canvas: Canvas { width: 3, height: 150 },
                ..CountdownConfig::default()
            },
            CountdownConfig {
                canvas: Canvas { width: 600, height: 100 },
                ..CountdownConfig::default()
            },
            CountdownConfig {
                canvas: Canvas { width: 5000, height: 150 },
                ..CountdownConfig::default()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn rejects_bad_font_settings() {
        let mut config = CountdownConfig::default();
        config.fonts.label_size = f32::NAN;
        assert!(config.validate().is_err());

        for size in [0.0, -1.0, 4097.0, 1e9] {
            let mut config = CountdownConfig::default();
            config.fonts.numeral_size = size;
            let err = config.validate().unwrap_err().to_string();
            assert!(err.contains("fonts.numeral_size"), "{size}: {err}");
        }

        let mut config = CountdownConfig::default();
        config.fonts.label_size = MAX_CANVAS_SIDE as f32;
        config.validate().unwrap();

        let mut config = CountdownConfig::default();
        config.fonts.candidates = vec![FontCandidate {
            path: PathBuf::from("x.ttf"),
            sha256: Some("abc".to_owned()),
        }];
        assert!(config.validate().is_err());
    }
}
