use crate::error_codes::{CountdownError, Result};

pub type Rgba8 = [u8; 4];

pub const DEFAULT_BACKGROUND: Rgba8 = [0x00, 0x00, 0x00, 0xFF];
pub const DEFAULT_BOX_FILL: Rgba8 = [0x1E, 0x1E, 0x1E, 0xFF];
pub const DEFAULT_DIGIT_COLOR: Rgba8 = [0xFF, 0xFF, 0xFF, 0xFF];

const NAMED_COLORS: [(&str, Rgba8); 14] = [
    ("black", [0x00, 0x00, 0x00, 0xFF]),
    ("white", [0xFF, 0xFF, 0xFF, 0xFF]),
    ("red", [0xFF, 0x00, 0x00, 0xFF]),
    ("green", [0x00, 0x80, 0x00, 0xFF]),
    ("blue", [0x00, 0x00, 0xFF, 0xFF]),
    ("yellow", [0xFF, 0xFF, 0x00, 0xFF]),
    ("orange", [0xFF, 0xA5, 0x00, 0xFF]),
    ("purple", [0x80, 0x00, 0x80, 0xFF]),
    ("gray", [0x80, 0x80, 0x80, 0xFF]),
    ("grey", [0x80, 0x80, 0x80, 0xFF]),
    ("silver", [0xC0, 0xC0, 0xC0, 0xFF]),
    ("navy", [0x00, 0x00, 0x80, 0xFF]),
    ("teal", [0x00, 0x80, 0x80, 0xFF]),
    ("maroon", [0x80, 0x00, 0x00, 0xFF]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Rgba8,
    pub box_fill: Rgba8,
    pub digit_color: Rgba8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND,
            box_fill: DEFAULT_BOX_FILL,
            digit_color: DEFAULT_DIGIT_COLOR,
        }
    }
}

/// Each override is independent; empty strings count as absent.
pub fn resolve_palette(
    background: Option<&str>,
    box_fill: Option<&str>,
    digit_color: Option<&str>,
) -> Result<Palette> {
    let defaults = Palette::default();
    Ok(Palette {
        background: resolve_field("bg", background, defaults.background)?,
        box_fill: resolve_field("box", box_fill, defaults.box_fill)?,
        digit_color: resolve_field("digit", digit_color, defaults.digit_color)?,
    })
}

fn resolve_field(field: &'static str, raw: Option<&str>, default: Rgba8) -> Result<Rgba8> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => parse_color(value).ok_or_else(|| CountdownError::InvalidColor {
            field,
            value: value.to_owned(),
        }),
    }
}

/// `#RRGGBB`, `RRGGBB`, `#RGB`, `RGB` or one of the fixed color names.
pub fn parse_color(raw: &str) -> Option<Rgba8> {
    let value = raw.trim();
    let lowered = value.to_ascii_lowercase();
    if let Some((_, color)) = NAMED_COLORS.iter().find(|(name, _)| *name == lowered) {
        return Some(*color);
    }

    let hex = value.strip_prefix('#').unwrap_or(value);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
            0xFF,
        ]),
        3 => {
            let mut out = [0xFF; 4];
            for (slot, digit) in out.iter_mut().zip(hex.chars()) {
                let nibble = digit.to_digit(16)? as u8;
                *slot = nibble * 0x11;
            }
            Some(out)
        }
        _ => None,
    }
}
