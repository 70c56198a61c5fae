// SPDX-License-Identifier: MIT
//
// Hash DRBG: Pluggable Entropy and Hash-Based CSPRNG
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara
//
// https://github.com/vbocan/qrng-data-diode

//! Hash-based derivation function
//!
//! Compresses seed material of any length into exactly `seed_len` bytes:
//!
//! ```text
//! temp = H(counter || bits(seed_len) || material)
//!     || H(counter+1 || bits(seed_len) || material)
//!     || ...
//! seed = leftmost seed_len bytes of temp
//! ```
//!
//! The counter is seeded once from a clock reading and keeps running across
//! calls. Every iteration rehashes the material from its first byte.

use crate::clock::Clock;
use crate::digest::HashAlgorithm;
use crate::{Error, Result};
use zeroize::Zeroizing;

/// Hash_df instance bound to one algorithm and seed length
#[derive(Debug)]
pub struct HashDf {
    algorithm: HashAlgorithm,
    seed_len: usize,
    counter: u8,
}

impl HashDf {
    pub fn new(algorithm: HashAlgorithm, seed_len: usize, clock: &dyn Clock) -> Self {
        Self {
            algorithm,
            seed_len,
            counter: clock.nanos().to_le_bytes()[0],
        }
    }

    pub fn seed_len(&self) -> usize {
        self.seed_len
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Derive `seed_len` bytes from `material`
    pub fn derive(&mut self, material: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let bits = u32::try_from(self.seed_len * 8).map_err(|_| {
            Error::Config(format!("seed_len {} too large for Hash_df", self.seed_len))
        })?;
        let bits = bits.to_be_bytes();

        let mut seed = Zeroizing::new(Vec::with_capacity(self.seed_len + self.algorithm.output_len()));
        let mut hasher = self.algorithm.hasher();

        while seed.len() < self.seed_len {
            hasher.update(&[self.counter]);
            hasher.update(&bits);
            hasher.update(material);
            let block = Zeroizing::new(hasher.finalize_reset());
            seed.extend_from_slice(&block);
            self.counter = self.counter.wrapping_add(1);
        }

        seed.truncate(self.seed_len);
        Ok(seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn test_output_length() {
        let clock = FixedClock::new(0);
        for (alg, len) in [
            (HashAlgorithm::Sha256, 32),
            (HashAlgorithm::Sha256, 55),
            (HashAlgorithm::Sha512, 111),
            (HashAlgorithm::Sha512, 7),
        ] {
            let mut df = HashDf::new(alg, len, &clock);
            assert_eq!(df.derive(b"material").unwrap().len(), len);
        }
    }

    #[test]
    fn test_matches_reference_construction() {
        let clock = FixedClock::new(0x0102);
        let mut df = HashDf::new(HashAlgorithm::Sha256, 40, &clock);
        let seed = df.derive(b"abc").unwrap();

        let bits = 320u32.to_be_bytes();
        let mut expected = HashAlgorithm::Sha256.digest_parts(&[&[0x02u8][..], &bits[..], &b"abc"[..]]);
        expected.extend(HashAlgorithm::Sha256.digest_parts(&[&[0x03u8][..], &bits[..], &b"abc"[..]]));
        expected.truncate(40);

        assert_eq!(seed.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_counter_keeps_running() {
        let clock = FixedClock::new(0);
        let mut df = HashDf::new(HashAlgorithm::Sha512, 64, &clock);
        let first = df.derive(b"same").unwrap();
        let second = df.derive(b"same").unwrap();
        assert_ne!(first, second);

        let mut replay = HashDf::new(HashAlgorithm::Sha512, 64, &clock);
        assert_eq!(replay.derive(b"same").unwrap(), first);
    }

    #[test]
    fn test_empty_material() {
        let mut df = HashDf::new(HashAlgorithm::Sha256, 32, &FixedClock::new(1));
        assert_eq!(df.derive(&[]).unwrap().len(), 32);
    }
}
