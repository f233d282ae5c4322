//! Revision identifiers
//!
//! A revision id is a printable string `<generation>-<hash>`: the generation
//! is a positive integer that grows by one on every edit, the hash is an
//! opaque token (lowercase hex when minted here). Minting hashes the
//! generation, the parent revision and the canonical body together, so two
//! replicas writing the same edit on the same parent mint the same id.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::errors::{RevisionError, RevisionResult};

/// Hex digits kept from the digest when minting a revision id.
const HASH_LEN: usize = 32;

/// A revision identifier, or the empty marker
///
/// The empty marker stands in for "no revision": the parent of a root entry
/// and the current revision of a document that does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevId(String);

impl RevId {
    /// Wrap a raw revision id string
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The empty marker (root parent / missing document)
    pub fn none() -> Self {
        Self(String::new())
    }

    /// True for the empty marker
    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// The raw string form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(generation, hash)`
    ///
    /// The generation must be a positive integer; the hash is opaque and
    /// only required to be non-empty.
    pub fn parse(&self) -> RevisionResult<(u64, &str)> {
        let (gen, hash) = self
            .0
            .split_once('-')
            .ok_or_else(|| RevisionError::InvalidRevId(self.0.clone()))?;

        let gen: u64 = gen
            .parse()
            .map_err(|_| RevisionError::InvalidRevId(self.0.clone()))?;

        if gen == 0 || hash.is_empty() {
            return Err(RevisionError::InvalidRevId(self.0.clone()));
        }

        Ok((gen, hash))
    }

    /// The generation, treating the empty marker as generation 0
    pub fn generation(&self) -> RevisionResult<u64> {
        if self.is_none() {
            return Ok(0);
        }
        Ok(self.parse()?.0)
    }

    /// Mint a new revision id
    ///
    /// The digest covers `(generation, parent, canonical_body)` so the id is
    /// deterministic across replicas and negligible to collide across
    /// divergent histories.
    pub fn mint(generation: u64, parent: &RevId, canonical_body: &str) -> RevId {
        let mut hasher = Sha256::new();
        hasher.update(generation.to_string().as_bytes());
        hasher.update(b"\0");
        hasher.update(parent.as_str().as_bytes());
        hasher.update(b"\0");
        hasher.update(canonical_body.as_bytes());

        let digest = format!("{:x}", hasher.finalize());
        RevId(format!("{}-{}", generation, &digest[..HASH_LEN]))
    }
}

impl fmt::Display for RevId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RevId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let rev = RevId::new("3-abc123");
        assert_eq!(rev.parse().unwrap(), (3, "abc123"));
    }

    #[test]
    fn test_parse_rejects_missing_dash() {
        assert!(RevId::new("3abc").parse().is_err());
    }

    #[test]
    fn test_parse_rejects_zero_generation() {
        assert!(RevId::new("0-abc").parse().is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_generation() {
        assert!(RevId::new("x-abc").parse().is_err());
        assert!(RevId::new("-abc").parse().is_err());
    }

    #[test]
    fn test_parse_rejects_empty_hash() {
        assert!(RevId::new("3-").parse().is_err());
    }

    #[test]
    fn test_generation_of_empty_marker_is_zero() {
        assert_eq!(RevId::none().generation().unwrap(), 0);
    }

    #[test]
    fn test_mint_round_trips_generation() {
        let rev = RevId::mint(7, &RevId::new("6-deadbeef"), "{\"v\":1}");
        let (gen, hash) = rev.parse().unwrap();
        assert_eq!(gen, 7);
        assert_eq!(hash.len(), 32);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_mint_is_deterministic() {
        let parent = RevId::new("1-aa");
        let a = RevId::mint(2, &parent, "{\"v\":1}");
        let b = RevId::mint(2, &parent, "{\"v\":1}");
        assert_eq!(a, b);
    }

    #[test]
    fn test_mint_differs_by_parent_and_body() {
        let a = RevId::mint(2, &RevId::new("1-aa"), "{\"v\":1}");
        let b = RevId::mint(2, &RevId::new("1-bb"), "{\"v\":1}");
        let c = RevId::mint(2, &RevId::new("1-aa"), "{\"v\":2}");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
