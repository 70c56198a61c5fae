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

//! Entropy from the operating system's random device

use super::EntropySource;
use crate::cancel::CancellationToken;
use crate::traits::Lifecycle;
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicBool, Ordering};

/// Entropy source reading from `getrandom`/`BCryptGenRandom` through `OsRng`
#[derive(Debug)]
pub struct OsSource {
    open: AtomicBool,
}

impl OsSource {
    /// Probe the OS generator once; fails with `Unsupported` if it is unusable
    pub fn new() -> Result<Self> {
        let mut probe = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| Error::Unsupported(format!("OS random device unavailable: {}", e)))?;

        Ok(Self {
            open: AtomicBool::new(true),
        })
    }
}

impl Lifecycle for OsSource {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl EntropySource for OsSource {
    fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }
        if cancel.is_cancelled() {
            self.close();
            return Err(Error::ClosedByInterrupt);
        }

        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| Error::Source(format!("OS random device failed: {}", e)))
    }

    fn recommended_buffer_size(&self) -> usize {
        64
    }

    fn name(&self) -> &'static str {
        "os"
    }
}
