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

//! Compressibility self-test
//!
//! A coarse sanity check on generator output: a random sample should not
//! shrink under a strong compressor. Passing it proves nothing about
//! randomness; failing it is a strong hint that something is broken.

use crate::{Error, Result};
use serde::Serialize;
use zstd::zstd_safe::CParameter;

/// Samples shorter than this are rejected as too small to judge
pub const MIN_SAMPLE_LEN: usize = 8;

/// Compressed/original ratio below which a sample is flagged
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Outcome of one self-test run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelfTestReport {
    pub sample_len: usize,
    pub compressed_len: usize,
    pub ratio: f64,
    /// Sample compressed below the threshold
    pub suspicious: bool,
}

/// Compressibility test with a configurable threshold
#[derive(Debug, Clone, Copy)]
pub struct CompressionTest {
    threshold: f64,
}

impl Default for CompressionTest {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl CompressionTest {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn check(&self, sample: &[u8]) -> Result<SelfTestReport> {
        if sample.len() < MIN_SAMPLE_LEN {
            return Err(Error::SampleTooSmall {
                len: sample.len(),
                min: MIN_SAMPLE_LEN,
            });
        }

        let compressed_len = compress(sample)?.len();
        let ratio = compressed_len as f64 / sample.len() as f64;

        Ok(SelfTestReport {
            sample_len: sample.len(),
            compressed_len,
            ratio,
            suspicious: ratio < self.threshold,
        })
    }
}

/// Maximum-level zstd with every optional frame field turned off
fn compress(sample: &[u8]) -> Result<Vec<u8>> {
    let level = *zstd::compression_level_range().end();
    let mut compressor = zstd::bulk::Compressor::new(level)?;
    compressor.set_parameter(CParameter::ChecksumFlag(false))?;
    compressor.set_parameter(CParameter::ContentSizeFlag(false))?;
    compressor.set_parameter(CParameter::DictIdFlag(false))?;
    Ok(compressor.compress(sample)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::RngCore;

    #[test]
    fn test_zero_sample_is_suspicious() {
        let report = CompressionTest::default().check(&[0u8; 4096]).unwrap();
        assert!(report.suspicious);
        assert!(report.compressed_len < 100);
    }

    #[test]
    fn test_random_sample_passes() {
        let mut sample = vec![0u8; 4096];
        rand::thread_rng().fill_bytes(&mut sample);

        let report = CompressionTest::default().check(&sample).unwrap();
        assert!(!report.suspicious);
        assert!(report.ratio > 0.95);
    }

    #[test]
    fn test_repeating_pattern_is_suspicious() {
        let sample: Vec<u8> = (0..4096).map(|i| (i % 16) as u8).collect();
        assert!(CompressionTest::default().check(&sample).unwrap().suspicious);
    }

    #[test]
    fn test_small_sample_rejected() {
        let err = CompressionTest::default().check(&[1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::SampleTooSmall { len: 3, min: 8 }));
    }
}
