//! Session PINs and connection identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use derive_more::{Display, Error};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::GameError;

/// Number of digits in a PIN.
pub const PIN_LEN: usize = 6;

/// Smallest PIN value; PINs never start with a zero.
pub const PIN_MIN: u32 = 100_000;

/// Largest PIN value.
pub const PIN_MAX: u32 = 999_999;

/// Six-digit numeric code identifying an active session.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pin(String);

impl Pin {
    /// Parses and validates a PIN.
    pub fn parse(value: &str) -> Result<Self, PinError> {
        let value = value.trim();
        if value.len() != PIN_LEN {
            return Err(PinError::InvalidLength {
                expected: PIN_LEN,
                found: value.len(),
            });
        }
        if let Some((index, ch)) = value.char_indices().find(|(_, ch)| !ch.is_ascii_digit()) {
            return Err(PinError::InvalidCharacter { ch, index });
        }
        if value.starts_with('0') {
            return Err(PinError::LeadingZero);
        }
        Ok(Self(value.to_string()))
    }

    /// Builds a PIN from its numeric value, if in range.
    pub fn from_number(value: u32) -> Option<Self> {
        (PIN_MIN..=PIN_MAX)
            .contains(&value)
            .then(|| Self(value.to_string()))
    }

    /// Draws a uniformly random PIN.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.random_range(PIN_MIN..=PIN_MAX).to_string())
    }

    /// Numeric value of the PIN.
    pub fn value(&self) -> u32 {
        self.0.parse().unwrap_or(PIN_MIN)
    }

    /// The PIN as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Pin {
    type Err = PinError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Pin {
    type Error = PinError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Pin> for String {
    fn from(pin: Pin) -> Self {
        pin.0
    }
}

/// Picks a PIN for which `is_taken` is false.
///
/// Tries `attempts` random draws first, then scans the keyspace from a random
/// offset, so it only fails when every PIN is taken.
#[instrument(skip(rng, is_taken))]
pub fn allocate_pin<R, F>(rng: &mut R, attempts: u32, is_taken: F) -> Result<Pin, GameError>
where
    R: Rng + ?Sized,
    F: Fn(&Pin) -> bool,
{
    for attempt in 0..attempts {
        let pin = Pin::random(rng);
        if !is_taken(&pin) {
            return Ok(pin);
        }
        debug!(attempt, pin = %pin, "PIN collision, retrying");
    }

    let span = PIN_MAX - PIN_MIN + 1;
    let start = rng.random_range(0..span);
    warn!(attempts, "Random PIN draws exhausted, scanning keyspace");
    (0..span)
        .filter_map(|offset| Pin::from_number(PIN_MIN + (start + offset) % span))
        .find(|pin| !is_taken(pin))
        .ok_or(GameError::PinSpaceExhausted)
}

/// Why a string is not a valid PIN.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum PinError {
    /// Wrong number of characters.
    #[display("pin must be {expected} digits, got {found}")]
    InvalidLength {
        /// Required length.
        expected: usize,
        /// Length supplied.
        found: usize,
    },
    /// A non-digit character.
    #[display("invalid character '{ch}' at position {index}")]
    InvalidCharacter {
        /// Offending character.
        ch: char,
        /// Byte offset of the character.
        index: usize,
    },
    /// PINs start at 100000.
    #[display("pin must not start with 0")]
    LeadingZero,
}

/// Identifies one client connection; doubles as the player id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
#[display("conn-{_0}")]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_malformed_pins() {
        assert!(matches!(Pin::parse("12345"), Err(PinError::InvalidLength { .. })));
        assert!(matches!(Pin::parse("12a456"), Err(PinError::InvalidCharacter { ch: 'a', index: 2 })));
        assert_eq!(Pin::parse("012345"), Err(PinError::LeadingZero));
        assert_eq!(Pin::parse(" 123456 ").map(|p| p.value()), Ok(123_456));
    }

    #[test]
    fn allocate_pin_finds_the_last_free_pin() {
        let mut rng = rand::rng();
        let free = Pin::from_number(543_210).unwrap();
        let pin = allocate_pin(&mut rng, 8, |p| *p != free).unwrap();
        assert_eq!(pin, free);
    }

    #[test]
    fn allocate_pin_reports_exhaustion() {
        let mut rng = rand::rng();
        assert_eq!(allocate_pin(&mut rng, 8, |_| true), Err(GameError::PinSpaceExhausted));
    }

    #[test]
    fn from_number_respects_range() {
        assert!(Pin::from_number(99_999).is_none());
        assert!(Pin::from_number(1_000_000).is_none());
        assert_eq!(Pin::from_number(PIN_MIN).map(|p| p.to_string()), Some("100000".into()));
    }
}
