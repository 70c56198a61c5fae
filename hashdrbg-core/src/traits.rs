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

//! Capability traits shared by entropy sources and engines

use crate::Result;

/// Producer of random bytes
pub trait ByteSource {
    /// Fill `dest` completely or fail
    fn fill(&self, dest: &mut [u8]) -> Result<()>;

    /// Allocate and fill `len` bytes
    fn next_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.fill(&mut out)?;
        Ok(out)
    }
}

/// Open/close lifecycle
pub trait Lifecycle {
    fn is_open(&self) -> bool;

    /// Release resources; later reads fail with `NotOpen`
    fn close(&self);
}

/// Generator whose working state can be refreshed with new entropy
pub trait Reseedable {
    /// Reseed, mixing in `additional_input` when given
    fn reseed(&self, additional_input: Option<&[u8]>) -> Result<()>;
}
