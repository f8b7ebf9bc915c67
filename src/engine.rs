use anyhow::{bail, Result as AnyResult};
use chrono_tz::Tz;
use tracing::debug;
use url::form_urlencoded;

use crate::deadline::{parse_deadline, Clock, Deadline, Instant};
use crate::duration::{remaining, RemainingDuration};
use crate::encoding::{encode, RenderMode, RenderedCountdown};
use crate::error_codes::Result;
use crate::font_assets::{FontProvider, FontSet};
use crate::layout::ScoreboardGeometry;
use crate::palette::resolve_palette;
use crate::renderer::FrameRenderer;
use crate::schema::CountdownConfig;

/// Caller-supplied parameters of one render, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountdownRequest {
    pub end: Option<String>,
    pub background: Option<String>,
    pub box_fill: Option<String>,
    pub digit_color: Option<String>,
}

impl CountdownRequest {
    pub fn new(end: impl Into<String>) -> Self {
        Self {
            end: Some(end.into()),
            ..Self::default()
        }
    }

    /// Reads `end`, `bg`, `box` and `digit` from a query string. The first
    /// occurrence of a repeated key wins; unknown keys are ignored.
    pub fn from_query(query: &str) -> Self {
        let mut request = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "end" => &mut request.end,
                "bg" => &mut request.background,
                "box" => &mut request.box_fill,
                "digit" => &mut request.digit_color,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        request
    }
}

/// Long-lived render entry point. Holds the process configuration and the
/// shared font cache; safe to share across threads.
#[derive(Debug)]
pub struct CountdownEngine {
    config: CountdownConfig,
    tz: Tz,
    fonts: FontProvider,
}

impl CountdownEngine {
    pub fn new(config: CountdownConfig) -> AnyResult<Self> {
        config.validate()?;
        let tz = config.tz()?;
        let fonts = FontProvider::new(
            config.fonts.asset_root.clone(),
            config.fonts.candidates.clone(),
        );
        let engine = Self { config, tz, fonts };
        engine.check_expired_message()?;
        Ok(engine)
    }

    /// The expired message is drawn with either face, so both must cover it.
    fn check_expired_message(&self) -> AnyResult<()> {
        let Some(message) = &self.config.expired_message else {
            return Ok(());
        };
        let fonts = self.fonts();
        for face in [&fonts.numeral, &fonts.label] {
            let missing = face.missing_glyphs(message);
            if !missing.is_empty() {
                let missing = missing.into_iter().collect::<String>();
                bail!(
                    "expired_message uses characters '{missing}' that font '{}' cannot draw",
                    face.source()
                );
            }
        }
        Ok(())
    }

    pub fn config(&self) -> &CountdownConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn now(&self, clock: &dyn Clock) -> Instant {
        clock.now(self.tz)
    }

    pub fn fonts(&self) -> FontSet {
        self.fonts
            .resolve(self.config.fonts.numeral_size, self.config.fonts.label_size)
    }

    pub fn deadline(&self, request: &CountdownRequest) -> Result<Deadline> {
        parse_deadline(request.end.as_deref(), self.tz)
    }

    pub fn remaining(&self, request: &CountdownRequest, now: &Instant) -> Result<RemainingDuration> {
        let deadline = self.deadline(request)?;
        Ok(remaining(&now.with_timezone(&self.tz), &deadline))
    }

    /// Validates the request, then renders and encodes it. The deadline is
    /// checked before the colors, so a missing `end` wins over a bad color.
    pub fn render(
        &self,
        request: &CountdownRequest,
        now: &Instant,
        mode: RenderMode,
    ) -> Result<RenderedCountdown> {
        let start = self.remaining(request, now)?;
        let palette = resolve_palette(
            request.background.as_deref(),
            request.box_fill.as_deref(),
            request.digit_color.as_deref(),
        )?;

        let canvas = self.config.canvas;
        let mut renderer = FrameRenderer::new(
            palette,
            self.fonts(),
            ScoreboardGeometry::new(canvas.width, canvas.height),
        )
        .with_expired_message(self.config.expired_message.clone());

        debug!(
            total_seconds = start.total_seconds(),
            expired = start.expired,
            ?mode,
            "rendering countdown"
        );
        encode(
            &start,
            |remaining| renderer.render(remaining),
            mode,
            self.config.max_frames,
        )
    }
}
