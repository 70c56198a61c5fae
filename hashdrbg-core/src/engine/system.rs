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

//! Backend delegating byte production to the system generator
//!
//! Every request is served straight from `OsRng`, which the operating system
//! seeds and reseeds itself. The backend keeps no working state of its own,
//! so there is nothing secret to erase on close or reset. The derived seed
//! is only checked for presence.

use super::Backend;
use crate::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;

#[derive(Debug, Default)]
pub struct SystemBackend;

impl SystemBackend {
    /// Probe the system generator; the seed is not retained
    pub fn new(seed: &[u8]) -> Result<Self> {
        if seed.is_empty() {
            return Err(Error::Internal("empty seed handed to system backend".into()));
        }

        let mut probe = [0u8; 1];
        OsRng
            .try_fill_bytes(&mut probe)
            .map_err(|e| Error::Source(format!("OS generator unavailable: {}", e)))?;

        Ok(Self)
    }
}

impl Backend for SystemBackend {
    fn generate(&mut self, out: &mut [u8]) -> Result<()> {
        OsRng
            .try_fill_bytes(out)
            .map_err(|e| Error::Source(format!("system generator failed: {}", e)))
    }

    fn name(&self) -> &'static str {
        "os"
    }
}
