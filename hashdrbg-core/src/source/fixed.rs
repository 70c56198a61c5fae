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

//! Deterministic entropy source for tests

use super::EntropySource;
use crate::cancel::CancellationToken;
use crate::traits::Lifecycle;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Source replaying a fixed byte pattern
///
/// Not random. Exists so engines can be driven through known sequences.
#[derive(Debug)]
pub struct FixedSource {
    pattern: Vec<u8>,
    position: Mutex<usize>,
    reads: AtomicUsize,
    open: AtomicBool,
}

impl FixedSource {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Self {
        let mut pattern = pattern.into();
        if pattern.is_empty() {
            pattern.push(0);
        }
        Self {
            pattern,
            position: Mutex::new(0),
            reads: AtomicUsize::new(0),
            open: AtomicBool::new(true),
        }
    }

    /// Pattern 0, 1, ..., 255 repeating
    pub fn counting() -> Self {
        Self::new((0..=255u8).collect::<Vec<u8>>())
    }

    /// Number of successful reads served
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Lifecycle for FixedSource {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl EntropySource for FixedSource {
    fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        if cancel.is_cancelled() {
            self.close();
            return Err(Error::ClosedByInterrupt);
        }

        let mut position = self.position.lock();
        for byte in dest.iter_mut() {
            *byte = self.pattern[*position];
            *position = (*position + 1) % self.pattern.len();
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn recommended_buffer_size(&self) -> usize {
        self.pattern.len()
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
