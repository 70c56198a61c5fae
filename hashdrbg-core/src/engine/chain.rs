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

//! Digest-chaining byte generator (default backend)
//!
//! Working state is a state block and a seed block, each one digest long,
//! plus two counters. Each step emits
//!
//! ```text
//! out   = H(state_counter || state || seed)
//! state = state + out + 1            (mod 2^(8 * block length))
//! ```
//!
//! and every `cycle_len` steps the seed block evolves to
//! `H(seed || seed_counter)`. Bytes of the last block a caller did not need
//! are kept in a remainder buffer, served first by the next call and zeroed as
//! they are handed out.

use super::Backend;
use crate::digest::HashAlgorithm;
use crate::Result;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DigestChain {
    #[zeroize(skip)]
    algorithm: HashAlgorithm,
    #[zeroize(skip)]
    cycle_len: u64,
    state: Vec<u8>,
    seed: Vec<u8>,
    state_counter: u64,
    seed_counter: u64,
    remainder: Vec<u8>,
    cursor: usize,
}

impl DigestChain {
    /// Initialise working state from a derived seed
    pub fn new(algorithm: HashAlgorithm, seed: &[u8], cycle_len: u64) -> Self {
        let block_len = algorithm.output_len();

        Self {
            algorithm,
            cycle_len: cycle_len.max(1),
            state: algorithm.digest_parts(&[&[0x00][..], seed]),
            seed: algorithm.digest_parts(&[&[0x01][..], seed]),
            state_counter: 0,
            seed_counter: 0,
            remainder: Vec::with_capacity(block_len),
            cursor: 0,
        }
    }

    /// Unread bytes in the remainder buffer
    pub fn buffered(&self) -> usize {
        self.remainder.len() - self.cursor
    }

    pub fn state_counter(&self) -> u64 {
        self.state_counter
    }

    pub fn seed_counter(&self) -> u64 {
        self.seed_counter
    }

    /// Produce one output block and advance the working state
    fn step(&mut self) -> Zeroizing<Vec<u8>> {
        let block = Zeroizing::new(self.algorithm.digest_parts(&[
            &self.state_counter.to_be_bytes()[..],
            &self.state[..],
            &self.seed[..],
        ]));

        add_with_carry(&mut self.state, &block);
        self.state_counter = self.state_counter.wrapping_add(1);

        if self.state_counter % self.cycle_len == 0 {
            let evolved = self.algorithm.digest_parts(&[
                &self.seed[..],
                &self.seed_counter.to_be_bytes()[..],
            ]);
            self.seed.zeroize();
            self.seed = evolved;
            self.seed_counter = self.seed_counter.wrapping_add(1);
        }

        block
    }

    /// Copy unread remainder bytes into `out`, zeroing them in place
    fn drain_remainder(&mut self, out: &mut [u8]) -> usize {
        let n = self.buffered().min(out.len());
        let range = self.cursor..self.cursor + n;

        out[..n].copy_from_slice(&self.remainder[range.clone()]);
        self.remainder[range].zeroize();
        self.cursor += n;

        if self.cursor == self.remainder.len() {
            self.remainder.clear();
            self.cursor = 0;
        }
        n
    }
}

impl Backend for DigestChain {
    fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        let mut filled = self.drain_remainder(out);

        while filled < out.len() {
            let block = self.step();
            let take = block.len().min(out.len() - filled);
            out[filled..filled + take].copy_from_slice(&block[..take]);
            filled += take;

            if take < block.len() {
                self.remainder.extend_from_slice(&block[take..]);
                self.cursor = 0;
            }
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "digest-chain"
    }
}

/// `acc = acc + addend + 1`, big-endian, carry out discarded
fn add_with_carry(acc: &mut [u8], addend: &[u8]) {
    let mut carry = 1u16;
    for (a, b) in acc.iter_mut().rev().zip(addend.iter().rev()) {
        let sum = *a as u16 + *b as u16 + carry;
        *a = sum as u8;
        carry = sum >> 8;
    }
}
