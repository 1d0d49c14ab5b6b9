//! Port specifications as they appear in configuration files.
//!
//! A port specification is either a single port (`"443"`) or an inclusive
//! range (`"8000-8080"`). Two collections of specifications are compared by
//! the set of ports they cover, never by their text, so `["80-81", "70"]`
//! and `["70", "80", "81"]` are the same configuration.

use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Lowest port accepted in a specification.
pub const MIN_PORT: u16 = 1;
/// Highest port accepted in a specification.
pub const MAX_PORT: u16 = 65535;

const RANGE_SEPARATOR: char = '-';
const EXPECTED_RANGE_PARTS: usize = 2;

/// Failure to parse a single port token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("port specification is empty")]
    Empty,
    #[error("port `{value}` is not a valid integer")]
    InvalidPort { value: String },
    #[error("port {port} not in the range of {MIN_PORT}-{MAX_PORT}")]
    OutOfRange { port: i64 },
    #[error("ports {start}, {end} needs to be in a rising sequence")]
    NotRisingSequence { start: u16, end: u16 },
    #[error("port range `{value}` must have exactly one `-` separator")]
    InvalidRangeLength { value: String },
}

/// A port token that could not be parsed, with the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse protocols port range \"{input}\": {source}")]
pub struct PortRangeParseError {
    pub input: String,
    #[source]
    pub source: PortError,
}

impl PortRangeParseError {
    fn new(input: &str, source: PortError) -> Self {
        Self {
            input: input.to_string(),
            source,
        }
    }
}

/// An inclusive port range; a single port has `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortRange {
    start: u16,
    end: u16,
}

impl PortRange {
    /// Build a range from numeric bounds, enforcing the same rules as [`PortRange::parse`].
    pub fn new(start: u16, end: u16) -> Result<Self, PortError> {
        check_bound(i64::from(start))?;
        check_bound(i64::from(end))?;
        if end < start {
            return Err(PortError::NotRisingSequence { start, end });
        }
        Ok(Self { start, end })
    }

    /// Range covering exactly one port.
    pub fn single(port: u16) -> Result<Self, PortError> {
        Self::new(port, port)
    }

    /// Parse `"N"` or `"N-M"`.
    pub fn parse(input: &str) -> Result<Self, PortRangeParseError> {
        let parsed = if input.contains(RANGE_SEPARATOR) {
            parse_range(input)
        } else {
            parse_port(input).map(|port| Self {
                start: port,
                end: port,
            })
        };

        parsed.map_err(|source| PortRangeParseError::new(input, source))
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn is_single(&self) -> bool {
        self.start == self.end
    }

    /// Every port covered by this range.
    pub fn ports(&self) -> impl Iterator<Item = u16> {
        self.start..=self.end
    }
}

impl Display for PortRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}{RANGE_SEPARATOR}{}", self.start, self.end)
        }
    }
}

impl FromStr for PortRange {
    type Err = PortRangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for PortRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PortRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        PortRange::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_range(input: &str) -> Result<PortRange, PortError> {
    let parts: Vec<&str> = input.split(RANGE_SEPARATOR).collect();
    if parts.len() != EXPECTED_RANGE_PARTS {
        return Err(PortError::InvalidRangeLength {
            value: input.to_string(),
        });
    }

    let start = parse_port(parts[0])?;
    let end = parse_port(parts[1])?;
    if end < start {
        return Err(PortError::NotRisingSequence { start, end });
    }

    Ok(PortRange { start, end })
}

fn parse_port(raw: &str) -> Result<u16, PortError> {
    if raw.is_empty() {
        return Err(PortError::Empty);
    }

    let port: i64 = raw.parse().map_err(|_| PortError::InvalidPort {
        value: raw.to_string(),
    })?;
    check_bound(port)
}

fn check_bound(port: i64) -> Result<u16, PortError> {
    if port < i64::from(MIN_PORT) || port > i64::from(MAX_PORT) {
        return Err(PortError::OutOfRange { port });
    }
    // In range, so the conversion cannot fail.
    u16::try_from(port).map_err(|_| PortError::OutOfRange { port })
}

/// Parse every token of a raw port collection, failing on the first bad token.
pub fn parse_ports<S: AsRef<str>>(raw: &[S]) -> Result<Vec<PortRange>, PortRangeParseError> {
    raw.iter().map(|item| PortRange::parse(item.as_ref())).collect()
}

/// Render ranges back to their configuration form.
pub fn format_ports(ranges: &[PortRange]) -> Vec<String> {
    ranges.iter().map(PortRange::to_string).collect()
}

/// Flatten ranges into the set of ports they cover.
///
/// Overlapping and duplicate ranges are idempotent.
pub fn expand_to_set(ranges: &[PortRange]) -> BTreeSet<u16> {
    ranges.iter().flat_map(PortRange::ports).collect()
}

/// Semantic equality of two parsed collections.
pub fn port_ranges_equal(left: &[PortRange], right: &[PortRange]) -> bool {
    expand_to_set(left) == expand_to_set(right)
}

/// Semantic equality of two raw collections.
///
/// Malformed input on either side is treated as a difference.
pub fn ports_equal<A: AsRef<str>, B: AsRef<str>>(left: &[A], right: &[B]) -> bool {
    let Ok(left) = parse_ports(left) else {
        return false;
    };
    let Ok(right) = parse_ports(right) else {
        return false;
    };

    port_ranges_equal(&left, &right)
}
