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

//! Hash DRBG Core Library
//!
//! A CSPRNG engine modeled on the hash-based deterministic random bit
//! generator of NIST SP 800-90A, fed by pluggable entropy sources.
//!
//! # Architecture
//!
//! The library is organized into modules representing core concerns:
//! - `source`: entropy source capability, registry and the concrete sources
//!   (OS generator, scheduler-jitter harvester, byte streams)
//! - `derivation`: hash-based derivation function (Hash_df)
//! - `nonce`: per-instantiate and per-reseed nonces
//! - `engine`: the lifecycle state machine and its byte-production backends
//! - `selftest`: compressibility sanity check on generator output
//! - `config`: configuration management with validation
//! - `error`: unified error types
//!
//! # Example
//!
//! ```no_run
//! use hashdrbg_core::{DrbgConfig, Engine};
//!
//! let engine = Engine::from_config(DrbgConfig::default())?;
//! let bytes = engine.next_bytes(32)?;
//! assert_eq!(bytes.len(), 32);
//! # Ok::<(), hashdrbg_core::Error>(())
//! ```

pub mod cancel;
pub mod clock;
pub mod config;
pub mod derivation;
pub mod digest;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod nonce;
pub mod selftest;
pub mod source;
pub mod traits;

pub use cancel::CancellationToken;
pub use config::DrbgConfig;
pub use digest::HashAlgorithm;
pub use engine::{Backend, BackendKind, Engine, EngineBuilder};
pub use error::{Error, Result};
pub use source::{EntropySource, SourceKind};
pub use traits::{ByteSource, Lifecycle, Reseedable};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
