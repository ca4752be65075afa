//! Human-readable serials and one-way fingerprints.

use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};

use trustmark_core::slugify;

/// Length of the displayed content fingerprint prefix.
pub const CONTENT_FINGERPRINT_LEN: usize = 46;

/// Length of the time-derived uniqueness suffix.
const SHORT_TOKEN_LEN: usize = 6;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Position of one record inside a multi-edition creation request (1-based).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Edition {
    number: u32,
    total: u32,
}

impl Edition {
    pub const SINGLE: Edition = Edition { number: 1, total: 1 };

    /// Normalize raw edition numbers. Anything outside `1..=total` collapses
    /// to a single edition.
    pub fn normalized(number: i64, total: i64) -> Self {
        if number < 1 || total < 1 || number > total {
            return Self::SINGLE;
        }
        match (u32::try_from(number), u32::try_from(total)) {
            (Ok(number), Ok(total)) => Self { number, total },
            _ => Self::SINGLE,
        }
    }

    /// All editions of a request for `count` copies (`count <= 0` means one).
    pub fn series(count: i64) -> Vec<Edition> {
        let total = u32::try_from(count.max(1)).unwrap_or(u32::MAX);
        (1..=total).map(|number| Edition { number, total }).collect()
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// `no/total` marker, present only for multi-edition requests.
    pub fn marker(&self) -> Option<String> {
        (self.total > 1).then(|| format!("{}/{}", self.number, self.total))
    }
}

impl Default for Edition {
    fn default() -> Self {
        Self::SINGLE
    }
}

fn base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}

/// Short upper-case token derived from the nanosecond clock reading `at`.
pub fn short_time_token(at: DateTime<Utc>) -> String {
    let nanos = at
        .timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1_000));
    let encoded = base36(nanos.unsigned_abs());
    let start = encoded.len().saturating_sub(SHORT_TOKEN_LEN);
    encoded[start..].to_string()
}

/// Assemble a serial from its parts: `SLUG-YEAR[-no/total]-TOKEN`.
pub fn serial_at(name: &str, edition: Edition, year: i32, token: &str) -> String {
    let slug = slugify(name);
    match edition.marker() {
        Some(marker) => format!("{slug}-{year}-{marker}-{token}"),
        None => format!("{slug}-{year}-{token}"),
    }
}

/// Serial for a record created at `now`.
pub fn serial(name: &str, edition: Edition, now: DateTime<Utc>) -> String {
    serial_at(name, edition, now.year(), &short_time_token(now))
}

/// Lower-case hex SHA-256 digest.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub fn serial_fingerprint(serial: &str) -> String {
    sha256_hex(serial.as_bytes())
}

/// Display-length prefix of the digest of the encoded metadata.
pub fn content_fingerprint(encoded_metadata: &[u8]) -> String {
    let mut digest = sha256_hex(encoded_metadata);
    digest.truncate(CONTENT_FINGERPRINT_LEN);
    digest
}
