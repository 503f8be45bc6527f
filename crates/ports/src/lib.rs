//! Port Set - validated, deduplicated collection of ports to monitor
//!
//! Takes integer-like tokens (from config or a comma-separated CLI string)
//! and normalizes them into a sorted set of unique ports. Supported token
//! forms:
//! - single port: "8080"
//! - surrounding whitespace is tolerated: " 443 "
//!
//! Pure validation; no socket is touched here. The empty set is a valid
//! configuration meaning "monitor nothing".

use prahari_common::{PrahariError, PrahariResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSet {
    ports: BTreeSet<u16>,
}

impl PortSet {
    /// Build a PortSet from integer-like tokens.
    ///
    /// Each token must parse to an integer in [1, 65535], otherwise the
    /// whole build fails with `InvalidPort` carrying the offending token.
    /// Duplicates are coalesced silently.
    pub fn build<I, S>(tokens: I) -> PrahariResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ports = BTreeSet::new();
        for token in tokens {
            let raw = token.as_ref().trim();
            let port: u16 = raw
                .parse()
                .ok()
                .filter(|p| *p >= 1)
                .ok_or_else(|| PrahariError::InvalidPort(raw.to_string()))?;
            ports.insert(port);
        }
        Ok(Self { ports })
    }

    /// Parse a comma-separated port list like "21,22,23,80".
    ///
    /// Empty tokens (",,") are skipped, so "80,,443" is two ports and ""
    /// is the empty set.
    pub fn parse(spec: &str) -> PrahariResult<Self> {
        Self::build(spec.split(',').filter(|t| !t.trim().is_empty()))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, port: u16) -> bool {
        self.ports.contains(&port)
    }

    /// Iterate ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }
}

impl FromIterator<u16> for PortSet {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for PortSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for port in &self.ports {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{}", port)?;
            first = false;
        }
        Ok(())
    }
}
