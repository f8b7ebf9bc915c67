use chrono::offset::LocalResult;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error_codes::{CountdownError, Result};

/// A point in time expressed in the fixed target timezone.
pub type Instant = DateTime<Tz>;

const LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const MINUTES_ONLY_LEN: usize = "YYYY-MM-DDTHH:MM".len();
const WITH_SECONDS_LEN: usize = "YYYY-MM-DDTHH:MM:SS".len();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn instant(&self) -> &Instant {
        &self.0
    }

    pub fn timezone(&self) -> Tz {
        self.0.timezone()
    }
}

/// Source of "now". Rendering never reads the wall clock directly.
pub trait Clock: Send + Sync {
    fn now(&self, tz: Tz) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self, tz: Tz) -> Instant {
        Utc::now().with_timezone(&tz)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(instant: &Instant) -> Self {
        Self(instant.with_timezone(&Utc))
    }
}

impl Clock for FixedClock {
    fn now(&self, tz: Tz) -> Instant {
        self.0.with_timezone(&tz)
    }
}

/// Parses `YYYY-MM-DDTHH:MM` or `YYYY-MM-DDTHH:MM:SS`, optionally followed by
/// `Z`, `+HH:MM` or `+HHMM`. Without an offset the value is wall-clock time in
/// `tz`; with one it is converted into `tz`.
pub fn parse_deadline(raw: Option<&str>, tz: Tz) -> Result<Deadline> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(CountdownError::MissingParameter);
    }

    let invalid = || CountdownError::InvalidFormat {
        input: raw.to_owned(),
    };

    let (local, offset) = split_offset(raw).ok_or_else(invalid)?;
    let naive = parse_local(local).ok_or_else(invalid)?;

    let instant = match offset {
        Some(offset) => match offset.from_local_datetime(&naive) {
            LocalResult::Single(fixed) => fixed.with_timezone(&tz),
            _ => return Err(invalid()),
        },
        None => localize(&naive, tz),
    };

    Ok(Deadline(instant))
}

fn split_offset(raw: &str) -> Option<(&str, Option<FixedOffset>)> {
    if !raw.is_ascii() {
        return None;
    }
    if let Some(local) = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z')) {
        return Some((local, FixedOffset::east_opt(0)));
    }

    // The date part contains '-', so only look for a sign past the time.
    let sign_at = raw
        .char_indices()
        .skip(MINUTES_ONLY_LEN)
        .find(|(_, ch)| matches!(ch, '+' | '-'))
        .map(|(index, _)| index);

    match sign_at {
        None => Some((raw, None)),
        Some(index) => {
            let offset = parse_offset(&raw[index..])?;
            Some((&raw[..index], Some(offset)))
        }
    }
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let (sign, digits) = match raw.as_bytes().first().copied()? {
        b'+' => (1, &raw[1..]),
        b'-' => (-1, &raw[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.len() {
        5 if digits.as_bytes()[2] == b':' => (&digits[..2], &digits[3..]),
        4 => (&digits[..2], &digits[2..]),
        _ => return None,
    };
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3_600 + minutes * 60))
}

fn parse_local(local: &str) -> Option<NaiveDateTime> {
    // chrono's numeric specifiers tolerate padding and signs; require exact digits.
    if !has_local_shape(local.as_bytes()) {
        return None;
    }
    match local.len() {
        MINUTES_ONLY_LEN => {
            NaiveDateTime::parse_from_str(&format!("{local}:00"), LOCAL_FORMAT).ok()
        }
        WITH_SECONDS_LEN => NaiveDateTime::parse_from_str(local, LOCAL_FORMAT).ok(),
        _ => None,
    }
}

/// `YYYY-MM-DDTHH:MM` optionally followed by `:SS`, every field all digits.
fn has_local_shape(bytes: &[u8]) -> bool {
    const SEPARATORS: [(usize, u8); 5] = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':')];

    if bytes.len() != MINUTES_ONLY_LEN && bytes.len() != WITH_SECONDS_LEN {
        return false;
    }
    bytes.iter().enumerate().all(|(index, byte)| {
        match SEPARATORS.iter().find(|(at, _)| *at == index) {
            Some((_, separator)) => byte == separator,
            None => byte.is_ascii_digit(),
        }
    })
}

/// Ambiguous wall-clock times take the earlier instant; times inside a
/// spring-forward gap use the offset in force just before the gap.
fn localize(naive: &NaiveDateTime, tz: Tz) -> Instant {
    match tz.from_local_datetime(naive) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let earlier = *naive - chrono::Duration::hours(3);
            let before_gap = tz.offset_from_utc_datetime(&earlier).fix();
            let utc = *naive - chrono::Duration::seconds(i64::from(before_gap.local_minus_utc()));
            Utc.from_utc_datetime(&utc).with_timezone(&tz)
        }
    }
}
