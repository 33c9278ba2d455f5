//! Exact-match editor origins.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::BridgeError;

fn origin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://(\[[0-9a-f:.]+\]|[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*)(:[0-9]{1,5})?$")
            .expect("origin pattern is valid")
    })
}

/// The `scheme://host[:port]` an embedded editor runs at.
///
/// Scheme and host are lowercased and a single trailing `/` is stripped at
/// parse time, so the stored value has the same shape as `MessageEvent.origin`.
/// Wildcards, paths, queries, credentials and the opaque `null` origin are
/// rejected. After parsing, [`Origin::matches`] is plain string equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin(String);

impl Origin {
    pub fn parse(input: &str) -> Result<Self, BridgeError> {
        let trimmed = input.trim();
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
        if trimmed.is_empty() || trimmed.contains('*') || trimmed == "null" {
            return Err(BridgeError::InvalidOrigin(input.to_string()));
        }

        let normalized = trimmed.to_ascii_lowercase();
        if !origin_pattern().is_match(&normalized) {
            return Err(BridgeError::InvalidOrigin(input.to_string()));
        }

        if let Some(port) = normalized
            .rsplit_once(':')
            .and_then(|(_, p)| p.parse::<u32>().ok())
        {
            if port > u16::MAX as u32 {
                return Err(BridgeError::InvalidOrigin(input.to_string()));
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against an inbound `event.origin`.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0 == candidate
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Origin {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
