//! Worker seeds.
//!
//! Every worker gets exactly one seed. The seed initialises the worker's
//! process-local random generator, so replaying a campaign with the same
//! seeds replays the same inputs.

use crate::result::{FuzzError, FuzzResult};
use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Length of a seed in bytes
pub const SEED_LEN: usize = 8;

/// Deterministic random-number-generator initializer for one worker
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    /// Create a seed from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh seed from the operating system CSPRNG
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SEED_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create from a byte slice, which must be exactly [`SEED_LEN`] long
    pub fn from_slice(bytes: &[u8]) -> FuzzResult<Self> {
        let inner: [u8; SEED_LEN] = bytes.try_into().map_err(|_| {
            FuzzError::configuration(format!(
                "Seed must be {SEED_LEN} bytes long, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(inner))
    }

    /// Parse from hex (with or without `0x` prefix)
    pub fn from_hex(hex: &str) -> FuzzResult<Self> {
        let trimmed = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(trimmed)
            .map_err(|_| FuzzError::configuration(format!("Invalid seed '{hex}'")))?;
        Self::from_slice(&bytes)
    }

    /// Raw seed bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// Lowercase hex without prefix
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Deterministic generator for this seed
    ///
    /// The seed bytes are stretched through SHA-256 so that short seeds
    /// still fill the generator's full state.
    #[must_use]
    pub fn rng(&self) -> StdRng {
        let mut hasher = Sha256::new();
        hasher.update(b"CHAINFUZZ_WORKER_RNG");
        hasher.update(self.0);
        StdRng::from_seed(hasher.finalize().into())
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seed({})", self.to_hex())
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Seed {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Assign one seed per worker.
///
/// Supplied seeds are used in order; when fewer than `count` were supplied
/// the remainder is generated. Seeds beyond `count` are ignored.
#[must_use]
pub fn pad_seeds(supplied: &[Seed], count: usize) -> Vec<Seed> {
    let mut seeds: Vec<Seed> = supplied.iter().take(count).copied().collect();
    while seeds.len() < count {
        seeds.push(Seed::generate());
    }
    seeds
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn test_from_hex_with_prefix() {
        let seed = Seed::from_hex("0x0102030405060708").unwrap();
        assert_eq!(seed.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(seed.to_hex(), "0102030405060708");
    }

    #[test]
    fn test_from_hex_rejects_wrong_length() {
        let err = Seed::from_hex("0102").unwrap_err();
        assert!(err.to_string().contains("8 bytes"));
    }

    #[test]
    fn test_from_hex_rejects_garbage() {
        assert!(Seed::from_hex("zzzzzzzzzzzzzzzz").is_err());
    }

    #[test]
    fn test_same_seed_same_stream() {
        let seed = Seed::new([7; SEED_LEN]);
        let mut a = seed.rng();
        let mut b = seed.rng();
        for _ in 0..4 {
            assert_eq!(a.gen::<u64>(), b.gen::<u64>());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = Seed::new([1; SEED_LEN]).rng();
        let mut b = Seed::new([2; SEED_LEN]).rng();
        let xs: [u64; 2] = [a.gen(), a.gen()];
        let ys: [u64; 2] = [b.gen(), b.gen()];
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_serde_as_hex() {
        let seed = Seed::new([0xab; SEED_LEN]);
        let json = serde_json::to_string(&seed).unwrap();
        assert_eq!(json, "\"abababababababab\"");
        let back: Seed = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seed);
    }

    #[test]
    fn test_pad_seeds_scenario() {
        let supplied = [Seed::new([1; SEED_LEN]), Seed::new([2; SEED_LEN])];
        let seeds = pad_seeds(&supplied, 3);
        assert_eq!(seeds.len(), 3);
        assert_eq!(seeds[0], supplied[0]);
        assert_eq!(seeds[1], supplied[1]);
        assert_eq!(seeds[2].as_bytes().len(), SEED_LEN);
    }

    #[test]
    fn test_pad_seeds_truncates_extra() {
        let supplied = [Seed::new([1; SEED_LEN]), Seed::new([2; SEED_LEN])];
        assert_eq!(pad_seeds(&supplied, 1), vec![supplied[0]]);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_padding_preserves_prefix(
                raw in proptest::collection::vec(any::<[u8; SEED_LEN]>(), 0..6),
                count in 0usize..10,
            ) {
                let supplied: Vec<Seed> = raw.into_iter().map(Seed::new).collect();
                let seeds = pad_seeds(&supplied, count);
                prop_assert_eq!(seeds.len(), count);
                for (assigned, given) in seeds.iter().zip(supplied.iter()) {
                    prop_assert_eq!(assigned, given);
                }
            }
        }
    }
}
