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

//! Configuration management for DRBG engines

use crate::digest::HashAlgorithm;
use crate::engine::BackendKind;
use crate::source::{JitterConfig, RequestLimits, SourceKind};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix for every configuration key
pub const ENV_PREFIX: &str = "HASHDRBG_";

/// Engine configuration
///
/// Flat so that every field maps to one `HASHDRBG_*` environment variable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrbgConfig {
    /// Hash family
    #[serde(default)]
    pub algorithm: HashAlgorithm,

    /// Seed length in bytes (defaults per hash family)
    #[serde(default)]
    pub seed_len: Option<usize>,

    /// Maximum personalization string length in bytes
    #[serde(default = "default_max_personalization_len")]
    pub max_personalization_len: usize,

    /// Maximum reseed additional input length in bytes
    #[serde(default = "default_max_additional_input_len")]
    pub max_additional_input_len: usize,

    /// Ceiling for the max_length of any entropy request
    #[serde(default = "default_max_entropy_input_len")]
    pub max_entropy_input_len: usize,

    /// Bytes generated by the engine self-test
    #[serde(default = "default_self_test_sample_len")]
    pub self_test_sample_len: usize,

    /// Generate requests between automatic reseeds (none = never)
    #[serde(default)]
    pub reseed_interval: Option<u64>,

    /// Generate steps between seed-block evolutions in the digest chain
    #[serde(default = "default_chain_cycle_len")]
    pub chain_cycle_len: u64,

    /// Byte-production backend
    #[serde(default)]
    pub backend: BackendKind,

    /// Entropy source opened by `Engine::from_config`
    #[serde(default)]
    pub source: SourceKind,

    /// Jitter harvester ring capacity in bytes
    #[serde(default = "default_jitter_capacity")]
    pub jitter_capacity: usize,

    /// Jitter busy-wait quantum in microseconds
    #[serde(default = "default_jitter_quantum_micros")]
    pub jitter_quantum_micros: u64,

    /// Minimum quanta folded per harvested byte
    #[serde(default = "default_jitter_min_quanta")]
    pub jitter_min_quanta: u32,

    /// Minimum cumulative iterations per harvested byte
    #[serde(default = "default_jitter_min_iterations")]
    pub jitter_min_iterations: u64,

    /// Noise threads spawned per quantum
    #[serde(default = "default_jitter_noise_threads")]
    pub jitter_noise_threads: usize,

    /// Explicit personalization string (auto-derived when absent)
    #[serde(default)]
    pub personalization: Option<String>,
}

impl Default for DrbgConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            seed_len: None,
            max_personalization_len: default_max_personalization_len(),
            max_additional_input_len: default_max_additional_input_len(),
            max_entropy_input_len: default_max_entropy_input_len(),
            self_test_sample_len: default_self_test_sample_len(),
            reseed_interval: None,
            chain_cycle_len: default_chain_cycle_len(),
            backend: BackendKind::default(),
            source: SourceKind::default(),
            jitter_capacity: default_jitter_capacity(),
            jitter_quantum_micros: default_jitter_quantum_micros(),
            jitter_min_quanta: default_jitter_min_quanta(),
            jitter_min_iterations: default_jitter_min_iterations(),
            jitter_noise_threads: default_jitter_noise_threads(),
            personalization: None,
        }
    }
}

impl DrbgConfig {
    /// Load configuration from `HASHDRBG_*` environment variables
    pub fn from_env() -> Result<Self> {
        let config: Self = envy::prefixed(ENV_PREFIX).from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML or TOML file, with environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(
                ENV_PREFIX.trim_end_matches('_'),
            ))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let seed_len = self.seed_len();

        if seed_len < 2 {
            return Err(Error::Config(format!(
                "seed_len must be at least 2 bytes, got {}",
                seed_len
            )));
        }

        if self.max_entropy_input_len < seed_len {
            return Err(Error::Config(format!(
                "max_entropy_input_len ({}) must be >= seed_len ({})",
                self.max_entropy_input_len, seed_len
            )));
        }

        if self.chain_cycle_len == 0 {
            return Err(Error::Config("chain_cycle_len must be > 0".to_string()));
        }

        if self.self_test_sample_len == 0 {
            return Err(Error::Config("self_test_sample_len must be > 0".to_string()));
        }

        if self.reseed_interval == Some(0) {
            return Err(Error::Config(
                "reseed_interval must be > 0 when set".to_string(),
            ));
        }

        if let Some(p) = &self.personalization {
            if p.len() > self.max_personalization_len {
                return Err(Error::PersonalizationTooLong {
                    len: p.len(),
                    max: self.max_personalization_len,
                });
            }
        }

        self.jitter().validate()
    }

    /// Effective seed length in bytes
    pub fn seed_len(&self) -> usize {
        self.seed_len
            .unwrap_or_else(|| self.algorithm.default_seed_len())
    }

    /// Security strength in bytes (half the seed length)
    pub fn security_strength(&self) -> usize {
        self.seed_len() / 2
    }

    pub fn request_limits(&self) -> RequestLimits {
        RequestLimits {
            security_strength: self.security_strength(),
            seed_len: self.seed_len(),
            max_entropy_input_len: self.max_entropy_input_len,
        }
    }

    pub fn jitter_quantum(&self) -> Duration {
        Duration::from_micros(self.jitter_quantum_micros)
    }

    pub fn jitter(&self) -> JitterConfig {
        JitterConfig {
            capacity: self.jitter_capacity,
            quantum: self.jitter_quantum(),
            min_quanta: self.jitter_min_quanta,
            min_iterations: self.jitter_min_iterations,
            noise_threads: self.jitter_noise_threads,
        }
    }
}

// Default value functions
fn default_max_personalization_len() -> usize {
    64
}

fn default_max_additional_input_len() -> usize {
    256
}

fn default_max_entropy_input_len() -> usize {
    4096
}

fn default_self_test_sample_len() -> usize {
    2048
}

fn default_chain_cycle_len() -> u64 {
    10
}

fn default_jitter_capacity() -> usize {
    64
}

fn default_jitter_quantum_micros() -> u64 {
    1000 // 1ms per quantum
}

fn default_jitter_min_quanta() -> u32 {
    6
}

fn default_jitter_min_iterations() -> u64 {
    64_000
}

fn default_jitter_noise_threads() -> usize {
    4
}
