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

//! Time sources for counter seeding and nonce generation

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of high-resolution time readings
pub trait Clock: Send + Sync {
    /// Nanoseconds since an arbitrary, clock-specific epoch
    fn nanos(&self) -> u64;
}

/// Wall-clock time in nanoseconds since the Unix epoch
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn nanos(&self) -> u64 {
        let now = Utc::now();
        now.timestamp_nanos_opt()
            .map(|n| n as u64)
            .unwrap_or_else(|| now.timestamp_micros() as u64 * 1_000)
    }
}

/// Clock that always reports the same reading (test double)
#[derive(Debug)]
pub struct FixedClock(AtomicU64);

impl FixedClock {
    pub fn new(nanos: u64) -> Self {
        Self(AtomicU64::new(nanos))
    }

    /// Move the clock to a new reading
    pub fn set(&self, nanos: u64) {
        self.0.store(nanos, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn nanos(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
