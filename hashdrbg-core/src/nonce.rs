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

//! Nonce generation for instantiate and reseed
//!
//! A nonce needs low repetition probability, not full entropy. The generator
//! pulls a short private seed from its entropy source once, then chains
//! `H(previous || seed || counter || time)` for every nonce it hands out.

use crate::cancel::CancellationToken;
use crate::clock::Clock;
use crate::digest::HashAlgorithm;
use crate::source::EntropySource;
use crate::Result;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

pub struct NonceGenerator {
    algorithm: HashAlgorithm,
    source: Arc<dyn EntropySource>,
    clock: Arc<dyn Clock>,
    nonce_len: usize,
    seed: Option<Zeroizing<Vec<u8>>>,
    chain: Zeroizing<Vec<u8>>,
    counter: u64,
}

impl NonceGenerator {
    /// Nonces are `security_strength / 2` bytes (at least one)
    pub fn new(
        algorithm: HashAlgorithm,
        security_strength: usize,
        source: Arc<dyn EntropySource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            algorithm,
            source,
            clock,
            nonce_len: (security_strength / 2).max(1),
            seed: None,
            chain: Zeroizing::new(Vec::new()),
            counter: 0,
        }
    }

    pub fn nonce_len(&self) -> usize {
        self.nonce_len
    }

    /// Next nonce; the first call reads the private seed from the source
    pub fn generate(&mut self, cancel: &CancellationToken) -> Result<Zeroizing<Vec<u8>>> {
        let seed = match self.seed.take() {
            Some(seed) => seed,
            None => {
                let mut seed = Zeroizing::new(vec![0u8; self.nonce_len]);
                self.source.read(&mut seed, cancel)?;
                debug!(len = self.nonce_len, "Nonce seed drawn");
                seed
            }
        };

        let mut nonce = Zeroizing::new(Vec::with_capacity(self.nonce_len + self.algorithm.output_len()));
        while nonce.len() < self.nonce_len {
            self.counter = self.counter.wrapping_add(1);
            let next = self.algorithm.digest_parts(&[
                &self.chain[..],
                &seed[..],
                &self.counter.to_be_bytes()[..],
                &self.clock.nanos().to_be_bytes()[..],
            ]);
            self.chain = Zeroizing::new(next);
            nonce.extend_from_slice(&self.chain);
        }
        nonce.truncate(self.nonce_len);

        self.seed = Some(seed);
        Ok(nonce)
    }

    /// Forget the private seed and chain; the next nonce redraws the seed
    pub fn wipe(&mut self) {
        self.seed = None;
        self.chain = Zeroizing::new(Vec::new());
        self.counter = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::source::FixedSource;
    use crate::traits::Lifecycle;

    fn generator(source: Arc<FixedSource>, strength: usize) -> NonceGenerator {
        NonceGenerator::new(
            HashAlgorithm::Sha256,
            strength,
            source,
            Arc::new(FixedClock::new(42)),
        )
    }

    #[test]
    fn test_length_and_uniqueness() {
        let source = Arc::new(FixedSource::counting());
        let mut gen = generator(source.clone(), 32);
        let token = CancellationToken::new();

        let a = gen.generate(&token).unwrap();
        let b = gen.generate(&token).unwrap();
        assert_eq!(a.len(), 16);
        assert_ne!(a, b);
        assert_eq!(source.reads(), 1);
    }

    #[test]
    fn test_long_nonce_spans_blocks() {
        let mut gen = generator(Arc::new(FixedSource::counting()), 160);
        assert_eq!(gen.generate(&CancellationToken::new()).unwrap().len(), 80);
    }

    #[test]
    fn test_deterministic_with_fixed_inputs() {
        let token = CancellationToken::new();
        let mut a = generator(Arc::new(FixedSource::counting()), 32);
        let mut b = generator(Arc::new(FixedSource::counting()), 32);
        assert_eq!(a.generate(&token).unwrap(), b.generate(&token).unwrap());
    }

    #[test]
    fn test_wipe_redraws_seed() {
        let source = Arc::new(FixedSource::counting());
        let mut gen = generator(source.clone(), 32);
        let token = CancellationToken::new();

        gen.generate(&token).unwrap();
        gen.wipe();
        gen.generate(&token).unwrap();
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_source_failure_keeps_state() {
        let source = Arc::new(FixedSource::counting());
        let mut gen = generator(source.clone(), 32);
        source.close();
        assert!(gen.generate(&CancellationToken::new()).is_err());
        assert_eq!(gen.counter, 0);
    }
}
