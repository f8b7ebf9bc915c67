//! Built-in 5x7 bitmap face used when no outline font can be loaded.
//!
//! Covers digits, uppercase ASCII letters, space and a little punctuation.
//! Lowercase letters render as their uppercase form. Each row is a bit mask
//! with the leftmost pixel in the highest of the five bits.

pub const GLYPH_WIDTH: u32 = 5;
pub const GLYPH_HEIGHT: u32 = 7;
const GLYPH_SPACING: u32 = 1;
/// Largest scale whose cell still fits on the largest allowed canvas.
const MAX_SCALE: u32 = crate::schema::MAX_CANVAS_SIDE / GLYPH_HEIGHT;

type GlyphRows = [u8; GLYPH_HEIGHT as usize];

const DIGITS: [GlyphRows; 10] = [
    [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
    [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b01110, 0b10001, 0b00001, 0b00010, 0b00100, 0b01000, 0b11111],
    [0b11111, 0b00010, 0b00100, 0b00010, 0b00001, 0b10001, 0b01110],
    [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
    [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
    [0b00110, 0b01000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b01000, 0b01000],
    [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
    [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00010, 0b01100],
];

const LETTERS: [GlyphRows; 26] = [
    [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
    [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
    [0b11100, 0b10010, 0b10001, 0b10001, 0b10001, 0b10010, 0b11100],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
    [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
    [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
    [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
    [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
    [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
    [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
    [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
    [0b10001, 0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001],
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
    [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
    [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
    [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
    [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
    [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
    [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
    [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
    [0b10001, 0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100],
    [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
];

const BLANK: GlyphRows = [0; GLYPH_HEIGHT as usize];
const EXCLAMATION: GlyphRows = [0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00000, 0b00100];
const COLON: GlyphRows = [0b00000, 0b01100, 0b01100, 0b00000, 0b01100, 0b01100, 0b00000];
const HYPHEN: GlyphRows = [0b00000, 0b00000, 0b00000, 0b11111, 0b00000, 0b00000, 0b00000];
const PERIOD: GlyphRows = [0b00000, 0b00000, 0b00000, 0b00000, 0b00000, 0b01100, 0b01100];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapFace {
    scale: u32,
}

impl BitmapFace {
    /// Picks the integer scale whose cell height is closest to `size_px`,
    /// within `1..=MAX_SCALE`.
    pub fn for_pixel_size(size_px: f32) -> Self {
        let scale = (size_px / GLYPH_HEIGHT as f32)
            .round()
            .max(1.0)
            .min(MAX_SCALE as f32) as u32;
        Self { scale }
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn glyph_width(&self) -> u32 {
        GLYPH_WIDTH * self.scale
    }

    pub fn glyph_height(&self) -> u32 {
        GLYPH_HEIGHT * self.scale
    }

    pub fn advance(&self) -> u32 {
        (GLYPH_WIDTH + GLYPH_SPACING) * self.scale
    }

    pub fn supports(&self, character: char) -> bool {
        glyph_rows(character).is_some()
    }

    /// True if the unscaled pixel at (x, y) is set. Unsupported characters are blank.
    pub fn sample(&self, character: char, x: u32, y: u32) -> bool {
        if x >= GLYPH_WIDTH || y >= GLYPH_HEIGHT {
            return false;
        }
        let Some(rows) = glyph_rows(character) else {
            return false;
        };
        let row_mask = rows[y as usize];
        ((row_mask >> (GLYPH_WIDTH - 1 - x)) & 1) == 1
    }

    /// Scaled 0/255 coverage mask, row-major, `glyph_width() * glyph_height()` bytes.
    pub fn coverage(&self, character: char) -> Vec<u8> {
        let width = self.glyph_width();
        let height = self.glyph_height();
        let mut mask = vec![0u8; (width * height) as usize];
        for y in 0..height {
            for x in 0..width {
                if self.sample(character, x / self.scale, y / self.scale) {
                    mask[(y * width + x) as usize] = 255;
                }
            }
        }
        mask
    }

    pub fn has_ink(&self, character: char) -> bool {
        glyph_rows(character).is_some_and(|rows| rows.iter().any(|row| *row != 0))
    }
}

fn glyph_rows(character: char) -> Option<&'static GlyphRows> {
    let upper = character.to_ascii_uppercase();
    match upper {
        '0'..='9' => Some(&DIGITS[(upper as u8 - b'0') as usize]),
        'A'..='Z' => Some(&LETTERS[(upper as u8 - b'A') as usize]),
        ' ' => Some(&BLANK),
        '!' => Some(&EXCLAMATION),
        ':' => Some(&COLON),
        '-' => Some(&HYPHEN),
        '.' => Some(&PERIOD),
        _ => None,
    }
}
