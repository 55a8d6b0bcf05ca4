use chrono::{Local, NaiveDateTime, TimeDelta};
use thiserror::Error;

pub const CUTOFF_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_PREFIX_FORMAT: &str = "%Y-%m-%d";

pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DurationError {
    #[error("invalid duration {input:?}: {reason}")]
    Malformed { input: String, reason: &'static str },
    #[error("invalid duration {input:?}: value out of range")]
    Overflow { input: String },
    #[error("cutoff out of range: {anchor} shifted by {offset}")]
    OutOfRange { anchor: NaiveDateTime, offset: TimeDelta },
}

/// Boundary shared by every file in one run.
///
/// `timestamp` is compared as text against the source timestamp columns, so
/// it uses the same zero-padded layout the source databases store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cutoff {
    pub timestamp: String,
    pub date_prefix: String,
}

impl Cutoff {
    pub fn resolve<C: Clock>(offset: TimeDelta, clock: &C) -> Result<Self, DurationError> {
        let anchor = clock.now();
        let shifted = anchor
            .checked_add_signed(offset)
            .ok_or(DurationError::OutOfRange { anchor, offset })?;

        Ok(Self {
            timestamp: shifted.format(CUTOFF_FORMAT).to_string(),
            date_prefix: shifted.format(DATE_PREFIX_FORMAT).to_string(),
        })
    }
}

const UNITS: &[(&str, u128)] = &[
    ("ns", 1),
    ("us", 1_000),
    ("µs", 1_000),
    ("μs", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

// Digits past this point cannot move the result by a full nanosecond.
const MAX_FRACTION_DIGITS: usize = 18;

/// Parses a signed duration such as `-24h`, `1h30m` or `-1.5h`.
pub fn parse_offset(input: &str) -> Result<TimeDelta, DurationError> {
    let malformed = |reason| DurationError::Malformed {
        input: input.to_string(),
        reason,
    };

    let (negative, mut rest) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    if rest == "0" {
        return Ok(TimeDelta::zero());
    }
    if rest.is_empty() {
        return Err(malformed("empty duration"));
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let whole_len = rest.bytes().take_while(u8::is_ascii_digit).count();
        let whole = &rest[..whole_len];
        rest = &rest[whole_len..];

        let mut fraction = "";
        if let Some(after_dot) = rest.strip_prefix('.') {
            let fraction_len = after_dot.bytes().take_while(u8::is_ascii_digit).count();
            fraction = &after_dot[..fraction_len];
            rest = &after_dot[fraction_len..];
        }

        if whole.is_empty() && fraction.is_empty() {
            return Err(malformed("expected a number"));
        }

        let unit_len = rest
            .find(|c: char| c == '.' || c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        if unit.is_empty() {
            return Err(malformed("missing unit"));
        }
        let scale = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, scale)| *scale)
            .ok_or_else(|| malformed("unknown unit"))?;

        let overflow = || DurationError::Overflow {
            input: input.to_string(),
        };

        let whole_value: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut component = whole_value.checked_mul(scale).ok_or_else(overflow)?;

        let fraction = &fraction[..fraction.len().min(MAX_FRACTION_DIGITS)];
        if !fraction.is_empty() {
            let digits: u128 = fraction.parse().map_err(|_| overflow())?;
            let divisor = 10_u128.pow(fraction.len() as u32);
            component = component
                .checked_add(digits * scale / divisor)
                .ok_or_else(overflow)?;
        }

        total_nanos = total_nanos.checked_add(component).ok_or_else(overflow)?;
        if total_nanos > i64::MAX as u128 {
            return Err(overflow());
        }
    }

    let nanos = total_nanos as i64;
    Ok(TimeDelta::nanoseconds(if negative { -nanos } else { nanos }))
}
