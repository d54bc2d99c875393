//! Hash-based ID generation for the in-memory store.
//!
//! IDs are SHA-256 digests of a seed, a sequence number and a collision nonce,
//! base36 encoded and tagged with the identity variant they belong to:
//!
//! - canonical object IDs: `{prefix}-c{hash}` (e.g. "sg-c3f8a1")
//! - version IDs: `{prefix}-v{hash}`
//! - relationship IDs: `{prefix}-r{hash}`
//!
//! Generation is deterministic for a given sequence of calls, which keeps
//! test output stable.
//!
//! # Example
//!
//! ```
//! use specgraph_store::id_generation::{IdGenerator, IdKind, parse_id};
//!
//! let mut generator = IdGenerator::new("sg");
//! let id = generator.generate(IdKind::Canonical, "Task").unwrap();
//!
//! assert!(id.starts_with("sg-c"));
//! assert_eq!(parse_id(&id, "sg"), Some(IdKind::Canonical));
//! ```

use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const BASE36_CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const MAX_NONCE: u32 = 100;
const MAX_LENGTH: usize = 8;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Unable to generate a unique ID after exhausting all nonces and length increases
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of nonces tried at the final length
        attempts: u32,
    },

    /// Invalid length parameter
    #[error("Length must be greater than 0")]
    InvalidLength,
}

/// Which identity an ID belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    /// Stable canonical ID of an object.
    Canonical,
    /// Version-specific ID of an object.
    Version,
    /// Relationship ID.
    Relationship,
}

impl IdKind {
    fn tag(self) -> char {
        match self {
            IdKind::Canonical => 'c',
            IdKind::Version => 'v',
            IdKind::Relationship => 'r',
        }
    }

    fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'c' => Some(IdKind::Canonical),
            'v' => Some(IdKind::Version),
            'r' => Some(IdKind::Relationship),
            _ => None,
        }
    }
}

/// Hash-based ID generator with collision detection.
///
/// `existing_ids` grows with every generated ID. The in-memory store owns one
/// generator for its whole lifetime, so this is bounded by the store size.
#[derive(Debug)]
pub struct IdGenerator {
    prefix: String,
    existing_ids: HashSet<String>,
    sequence: u64,
}

impl IdGenerator {
    /// Create a new ID generator for the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            existing_ids: HashSet::new(),
            sequence: 0,
        }
    }

    /// The prefix every generated ID starts with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Number of IDs generated so far
    pub fn generated(&self) -> usize {
        self.existing_ids.len()
    }

    /// Generate a new unique ID of the given kind.
    ///
    /// `seed` is mixed into the hash (typically the object type), so IDs of
    /// different object types diverge even at the same sequence number.
    ///
    /// # Errors
    ///
    /// Returns an error if unable to generate a unique ID after trying all nonces
    /// at the maximum length.
    pub fn generate(&mut self, kind: IdKind, seed: &str) -> Result<String, IdGenerationError> {
        self.sequence += 1;
        let mut id_length = self.adaptive_length();

        loop {
            for nonce in 0..MAX_NONCE {
                let id = self.generate_hash_id(kind, seed, nonce, id_length)?;

                if !self.existing_ids.contains(&id) {
                    if nonce > 0 {
                        debug!(
                            nonce,
                            id_length,
                            "Generated unique ID after {nonce} collision retries"
                        );
                    }
                    self.existing_ids.insert(id.clone());
                    return Ok(id);
                }
            }

            if id_length >= MAX_LENGTH {
                return Err(IdGenerationError::CollisionExhausted {
                    attempts: MAX_NONCE,
                });
            }

            warn!(
                id_length,
                max_nonce = MAX_NONCE,
                "All nonces exhausted, increasing ID length to {}",
                id_length + 1
            );
            id_length += 1;
        }
    }

    fn generate_hash_id(
        &self,
        kind: IdKind,
        seed: &str,
        nonce: u32,
        length: usize,
    ) -> Result<String, IdGenerationError> {
        let content = format!("{}|{}|{}|{}", kind.tag(), seed, self.sequence, nonce);

        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        let hash_bytes = hasher.finalize();

        let hash_str = encode_base36(&hash_bytes[..8], length)?;

        Ok(format!("{}-{}{}", self.prefix, kind.tag(), hash_str))
    }

    /// Determine hash length based on how many IDs exist
    ///
    /// - 0-500 IDs: 5 chars
    /// - 501-1,500: 6 chars
    /// - 1,500+: 7 chars
    fn adaptive_length(&self) -> usize {
        match self.existing_ids.len() {
            0..=500 => 5,
            501..=1500 => 6,
            _ => 7,
        }
    }
}

/// Encode bytes as base36 string.
///
/// Only the first 8 bytes of a digest are passed in, so the accumulated value
/// fits in a `u64`.
fn encode_base36(bytes: &[u8], length: usize) -> Result<String, IdGenerationError> {
    if length == 0 {
        return Err(IdGenerationError::InvalidLength);
    }

    let mut num: u64 = 0;
    for &byte in bytes {
        num = num.wrapping_shl(8).wrapping_add(u64::from(byte));
    }

    let mut result = Vec::with_capacity(length);
    let mut n = num;
    while result.len() < length {
        let remainder = usize::try_from(n % 36).unwrap_or(0);
        result.push(char::from(BASE36_CHARS[remainder]));
        n /= 36;
    }

    Ok(result.into_iter().rev().collect())
}

/// Classify an ID produced by an [`IdGenerator`] with `prefix`.
///
/// Returns `None` for IDs this generator could not have produced.
pub fn parse_id(id: &str, prefix: &str) -> Option<IdKind> {
    let rest = id.strip_prefix(prefix)?.strip_prefix('-')?;
    let mut chars = rest.chars();
    let kind = IdKind::from_tag(chars.next()?)?;
    let hash = chars.as_str();

    let valid_hash = (5..=MAX_LENGTH).contains(&hash.len())
        && hash.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase());

    valid_hash.then_some(kind)
}
