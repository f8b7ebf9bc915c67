use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use fontdue::layout::{CoordinateSystem, GlyphRasterConfig, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::bitmap_face::BitmapFace;

pub const FONT_ASSET_HASH_MISMATCH: &str = "FONT_ASSET_HASH_MISMATCH";
pub const BUNDLED_FONT_REL: &str = "assets/fonts/DejaVuSans-Bold.ttf";
pub const BUNDLED_FONT_SHA256: &str =
    "0d977336a6d5fba34eab8e3199eb218327161b5143749f802982c2bc34df0c96";

/// Ranked system faces tried after the bundled file.
pub const SYSTEM_BOLD_SANS: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
    "C:\\Windows\\Fonts\\arialbd.ttf",
];

/// Characters every candidate must cover: digits plus the column labels.
pub const REQUIRED_GLYPHS: &str = "0123456789DIASHORMNUTEG";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FontCandidate {
    pub path: PathBuf,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl FontCandidate {
    pub fn unpinned(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sha256: None,
        }
    }
}

pub fn default_candidates() -> Vec<FontCandidate> {
    let bundled = FontCandidate {
        path: PathBuf::from(BUNDLED_FONT_REL),
        sha256: Some(BUNDLED_FONT_SHA256.to_owned()),
    };
    std::iter::once(bundled)
        .chain(SYSTEM_BOLD_SANS.into_iter().map(FontCandidate::unpinned))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceKey {
    size_bits: u32,
    weight: FontWeight,
}

impl FaceKey {
    pub fn new(size_px: f32, weight: FontWeight) -> Self {
        Self {
            size_bits: size_px.to_bits(),
            weight,
        }
    }
}

pub enum FaceKind {
    Outline(Box<Font>),
    Bitmap(BitmapFace),
}

/// A loaded face bound to one pixel size.
pub struct Typeface {
    kind: FaceKind,
    size_px: f32,
    source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlyphKey {
    Outline(GlyphRasterConfig),
    Bitmap { character: char, scale: u32 },
}

#[derive(Debug, Clone)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub bitmap: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedGlyph {
    pub key: GlyphKey,
    pub x: f32,
    pub y: f32,
    pub width: usize,
    pub height: usize,
}

/// Pixel extents actually covered by glyph bitmaps, relative to the run origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkBounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl InkBounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) * 0.5
    }
}

#[derive(Debug, Clone)]
pub struct TextRun {
    pub glyphs: Vec<PositionedGlyph>,
    pub ink: Option<InkBounds>,
}

impl Typeface {
    pub fn bitmap(size_px: f32) -> Self {
        Self {
            kind: FaceKind::Bitmap(BitmapFace::for_pixel_size(size_px)),
            size_px,
            source: "builtin:bitmap-5x7".to_owned(),
        }
    }

    pub fn size_px(&self) -> f32 {
        self.size_px
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.kind, FaceKind::Bitmap(_))
    }

    /// Characters of `text` this face has no glyph for, whitespace excluded.
    pub fn missing_glyphs(&self, text: &str) -> Vec<char> {
        let mut missing = Vec::new();
        for ch in text.chars().filter(|ch| !ch.is_whitespace()) {
            let covered = match &self.kind {
                FaceKind::Outline(font) => font.lookup_glyph_index(ch) != 0,
                FaceKind::Bitmap(face) => face.supports(ch),
            };
            if !covered && !missing.contains(&ch) {
                missing.push(ch);
            }
        }
        missing
    }

    /// Lays `text` out on one line with its top-left at the origin, y down.
    pub fn shape(&self, text: &str) -> TextRun {
        let glyphs = match &self.kind {
            FaceKind::Outline(font) => {
                let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
                layout.reset(&LayoutSettings {
                    x: 0.0,
                    y: 0.0,
                    ..LayoutSettings::default()
                });
                layout.append(&[&**font], &TextStyle::new(text, self.size_px, 0));
                layout
                    .glyphs()
                    .iter()
                    .map(|glyph| PositionedGlyph {
                        key: GlyphKey::Outline(glyph.key),
                        x: glyph.x,
                        y: glyph.y,
                        width: glyph.width,
                        height: glyph.height,
                    })
                    .collect::<Vec<_>>()
            }
            FaceKind::Bitmap(face) => text
                .chars()
                .enumerate()
                .map(|(index, character)| {
                    let inked = face.has_ink(character);
                    PositionedGlyph {
                        key: GlyphKey::Bitmap {
                            character,
                            scale: face.scale(),
                        },
                        x: (index as u32 * face.advance()) as f32,
                        y: 0.0,
                        width: if inked { face.glyph_width() as usize } else { 0 },
                        height: if inked { face.glyph_height() as usize } else { 0 },
                    }
                })
                .collect::<Vec<_>>(),
        };

        let ink = glyphs
            .iter()
            .filter(|glyph| glyph.width > 0 && glyph.height > 0)
            .fold(None, |bounds: Option<InkBounds>, glyph| {
                let right = glyph.x + glyph.width as f32;
                let bottom = glyph.y + glyph.height as f32;
                Some(match bounds {
                    None => InkBounds {
                        min_x: glyph.x,
                        min_y: glyph.y,
                        max_x: right,
                        max_y: bottom,
                    },
                    Some(b) => InkBounds {
                        min_x: b.min_x.min(glyph.x),
                        min_y: b.min_y.min(glyph.y),
                        max_x: b.max_x.max(right),
                        max_y: b.max_y.max(bottom),
                    },
                })
            });

        TextRun { glyphs, ink }
    }

    pub fn rasterize(&self, key: GlyphKey) -> GlyphBitmap {
        match (&self.kind, key) {
            (FaceKind::Outline(font), GlyphKey::Outline(config)) => {
                let (metrics, bitmap) = font.rasterize_config(config);
                GlyphBitmap {
                    width: metrics.width,
                    height: metrics.height,
                    bitmap,
                }
            }
            (FaceKind::Bitmap(face), GlyphKey::Bitmap { character, .. }) => GlyphBitmap {
                width: face.glyph_width() as usize,
                height: face.glyph_height() as usize,
                bitmap: face.coverage(character),
            },
            _ => GlyphBitmap {
                width: 0,
                height: 0,
                bitmap: Vec::new(),
            },
        }
    }
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Typeface")
            .field("source", &self.source)
            .field("size_px", &self.size_px)
            .field("fallback", &self.is_fallback())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FontSet {
    pub numeral: Arc<Typeface>,
    pub label: Arc<Typeface>,
}

#[derive(Debug)]
enum Resolution {
    Trying(usize),
    Loaded(Typeface),
    ExhaustedFallback,
}

/// Resolves bold faces from a ranked candidate list and memoizes them per
/// `(size, weight)`. Share one provider per process.
#[derive(Debug)]
pub struct FontProvider {
    asset_root: PathBuf,
    candidates: Vec<FontCandidate>,
    cache: Mutex<HashMap<FaceKey, Arc<Typeface>>>,
}

impl FontProvider {
    pub fn new(asset_root: impl Into<PathBuf>, candidates: Vec<FontCandidate>) -> Self {
        Self {
            asset_root: asset_root.into(),
            candidates,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Never fails: the built-in bitmap face backs every size.
    pub fn resolve(&self, numeral_size: f32, label_size: f32) -> FontSet {
        FontSet {
            numeral: self.face(numeral_size, FontWeight::Bold),
            label: self.face(label_size, FontWeight::Bold),
        }
    }

    pub fn face(&self, size_px: f32, weight: FontWeight) -> Arc<Typeface> {
        let key = FaceKey::new(size_px, weight);
        if let Some(face) = self.cached(&key) {
            return face;
        }

        // Loading happens outside the lock; a racing thread may load the same
        // face, but the first insert wins and everyone gets that one.
        let loaded = Arc::new(self.load(size_px));
        match self.cache.lock() {
            Ok(mut cache) => Arc::clone(cache.entry(key).or_insert(loaded)),
            Err(poisoned) => Arc::clone(poisoned.into_inner().entry(key).or_insert(loaded)),
        }
    }

    fn cached(&self, key: &FaceKey) -> Option<Arc<Typeface>> {
        match self.cache.lock() {
            Ok(cache) => cache.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        }
    }

    fn load(&self, size_px: f32) -> Typeface {
        let mut state = Resolution::Trying(0);
        loop {
            state = match state {
                Resolution::Trying(index) => match self.candidates.get(index) {
                    None => Resolution::ExhaustedFallback,
                    Some(candidate) => match self.try_candidate(candidate, size_px) {
                        Ok(face) => Resolution::Loaded(face),
                        Err(error) => {
                            debug!(
                                candidate = %candidate.path.display(),
                                error = %error,
                                "skipping font candidate"
                            );
                            Resolution::Trying(index + 1)
                        }
                    },
                },
                Resolution::Loaded(face) => {
                    info!(source = face.source(), size_px, "loaded outline font");
                    return face;
                }
                Resolution::ExhaustedFallback => {
                    warn!(
                        size_px,
                        candidates = self.candidates.len(),
                        "no usable font candidate, using built-in bitmap face"
                    );
                    return Typeface::bitmap(size_px);
                }
            };
        }
    }

    fn try_candidate(&self, candidate: &FontCandidate, size_px: f32) -> Result<Typeface> {
        let path = self.candidate_path(&candidate.path);
        let bytes = fs::read(&path)
            .with_context(|| format!("failed to read font file '{}'", path.display()))?;
        if let Some(expected) = &candidate.sha256 {
            verify_font_hash(&path, &bytes, expected)?;
        }
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|error| anyhow!("failed to parse font {}: {error}", path.display()))?;
        ensure_supported_codepoints(&font, REQUIRED_GLYPHS, &path.display().to_string())?;

        Ok(Typeface {
            kind: FaceKind::Outline(Box::new(font)),
            size_px,
            source: path.display().to_string(),
        })
    }

    fn candidate_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.asset_root.join(path)
        }
    }
}

pub fn verify_font_hash(path: &Path, bytes: &[u8], expected: &str) -> Result<()> {
    let actual = sha256_hex(bytes);
    if !actual.eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "{}: {} expected sha256={} actual sha256={}",
            FONT_ASSET_HASH_MISMATCH,
            path.display(),
            expected,
            actual
        );
    }
    Ok(())
}

pub fn ensure_supported_codepoints(font: &Font, text: &str, font_name: &str) -> Result<()> {
    for ch in text.chars() {
        if ch.is_whitespace() {
            continue;
        }
        if font.lookup_glyph_index(ch) == 0 {
            return Err(anyhow!(
                "unsupported codepoint U+{:04X} ({}) in {}",
                ch as u32,
                ch.escape_default(),
                font_name
            ));
        }
    }
    Ok(())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
