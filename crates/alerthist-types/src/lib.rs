pub mod byte_order;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use byte_order::ByteOrder;

/// Seconds since the Unix epoch, as stored in the history file.
pub type Timestamp = i64;

/// Identifies one alert rule version: `(generator, signature, revision)`.
///
/// Equality is field-wise. No ordering is defined; the store only hashes keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatureKey {
    pub generator_id: i32,
    pub signature_id: i32,
    pub revision: i32,
}

impl SignatureKey {
    #[inline]
    #[must_use]
    pub const fn new(generator_id: i32, signature_id: i32, revision: i32) -> Self {
        Self {
            generator_id,
            signature_id,
            revision,
        }
    }
}

/// Renders as `gid:sid:rev`.
impl fmt::Display for SignatureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.generator_id, self.signature_id, self.revision
        )
    }
}

/// Error returned when parsing a [`SignatureKey`] or [`RawAlert`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAlertError {
    input: String,
    expected: &'static str,
}

impl fmt::Display for ParseAlertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid alert '{}': expected {}", self.input, self.expected)
    }
}

impl std::error::Error for ParseAlertError {}

fn split_fields<'a, const N: usize>(
    s: &'a str,
    expected: &'static str,
) -> Result<[&'a str; N], ParseAlertError> {
    let err = || ParseAlertError {
        input: s.to_owned(),
        expected,
    };
    let mut fields = [""; N];
    let mut parts = s.split(':');
    for field in &mut fields {
        *field = parts.next().ok_or_else(err)?.trim();
    }
    if parts.next().is_some() {
        return Err(err());
    }
    Ok(fields)
}

impl FromStr for SignatureKey {
    type Err = ParseAlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const EXPECTED: &str = "gid:sid:rev";
        let [gid, sid, rev] = split_fields::<3>(s, EXPECTED)?;
        let parse = |v: &str| {
            v.parse::<i32>().map_err(|_| ParseAlertError {
                input: s.to_owned(),
                expected: EXPECTED,
            })
        };
        Ok(Self::new(parse(gid)?, parse(sid)?, parse(rev)?))
    }
}

/// One observed instance of a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Occurrence {
    pub key: SignatureKey,
    pub timestamp: Timestamp,
}

impl Occurrence {
    #[inline]
    #[must_use]
    pub const fn new(key: SignatureKey, timestamp: Timestamp) -> Self {
        Self { key, timestamp }
    }
}

/// Alert tuple as handed over by the detection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAlert {
    pub gid: i32,
    pub sid: i32,
    pub rev: i32,
    pub timestamp: Timestamp,
}

impl RawAlert {
    #[must_use]
    pub const fn key(&self) -> SignatureKey {
        SignatureKey::new(self.gid, self.sid, self.rev)
    }
}

impl From<RawAlert> for Occurrence {
    fn from(alert: RawAlert) -> Self {
        Self::new(alert.key(), alert.timestamp)
    }
}

impl From<&RawAlert> for Occurrence {
    fn from(alert: &RawAlert) -> Self {
        Self::new(alert.key(), alert.timestamp)
    }
}

/// Parses `gid:sid:rev:timestamp`.
impl FromStr for RawAlert {
    type Err = ParseAlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const EXPECTED: &str = "gid:sid:rev:timestamp";
        let [gid, sid, rev, ts] = split_fields::<4>(s, EXPECTED)?;
        let err = || ParseAlertError {
            input: s.to_owned(),
            expected: EXPECTED,
        };
        Ok(Self {
            gid: gid.parse().map_err(|_| err())?,
            sid: sid.parse().map_err(|_| err())?,
            rev: rev.parse().map_err(|_| err())?,
            timestamp: ts.parse().map_err(|_| err())?,
        })
    }
}
