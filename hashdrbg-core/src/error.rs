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

//! Error types for the DRBG system
//!
//! Provides a unified error taxonomy using `thiserror`. Variants fall into five
//! families: configuration errors (caller must fix the request), unsupported
//! platform conditions, lifecycle violations, interruption and fatal internal
//! conditions.

pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for DRBG operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Requested minimum entropy is negative
    #[error("min_entropy is negative: {0}")]
    NegativeMinEntropy(i64),

    /// Requested minimum entropy is below the engine's security strength
    #[error("min_entropy {requested} is below the security strength {strength}")]
    MinEntropyBelowStrength { requested: i64, strength: usize },

    /// Requested minimum length cannot hold the requested entropy
    #[error("min_length {min_length} is below min_entropy {min_entropy}")]
    MinLengthBelowMinEntropy { min_length: i64, min_entropy: i64 },

    /// Requested minimum length is shorter than the seed length
    #[error("min_length {min_length} is below the seed length {seed_len}")]
    MinLengthBelowSeedLen { min_length: i64, seed_len: usize },

    /// Requested minimum length exceeds the requested maximum length
    #[error("min_length {min_length} exceeds max_length {max_length}")]
    MinLengthAboveMaxLength { min_length: i64, max_length: i64 },

    /// Requested maximum length exceeds the configured ceiling
    #[error("max_length {max_length} exceeds the entropy input ceiling {ceiling}")]
    MaxLengthAboveCeiling { max_length: i64, ceiling: usize },

    /// Personalization string longer than the configured maximum
    #[error("personalization string is {len} bytes, maximum is {max}")]
    PersonalizationTooLong { len: usize, max: usize },

    /// Additional input longer than the configured maximum
    #[error("additional input is {len} bytes, maximum is {max}")]
    AdditionalInputTooLong { len: usize, max: usize },

    /// Configuration validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entropy source cannot be instantiated on this host
    #[error("Unsupported on this platform: {0}")]
    Unsupported(String),

    /// Operation on an instance that has been closed
    #[error("not open")]
    NotOpen,

    /// A blocking read was interrupted through its cancellation token
    #[error("closed by interruption")]
    ClosedByInterrupt,

    /// The source was closed by another thread while a read was blocked on it
    #[error("closed by asynchronous close")]
    AsynchronousClose,

    /// Reseed called on an engine that holds no working state yet
    #[error("engine is not instantiated")]
    NotInstantiated,

    /// Instantiate called on an engine that already holds working state
    #[error("engine is already instantiated")]
    AlreadyInstantiated,

    /// Entropy source failed to deliver bytes
    #[error("Entropy source error: {0}")]
    Source(String),

    /// I/O error from a stream-backed source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Mandatory hash algorithm is not available
    #[error("Missing hash algorithm: {0}")]
    MissingAlgorithm(String),

    /// Self-test sample is too short to judge
    #[error("self-test sample of {len} bytes is too small, need at least {min}")]
    SampleTooSmall { len: usize, min: usize },

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Check if error was caused by an invalid caller request or configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::NegativeMinEntropy(_)
                | Error::MinEntropyBelowStrength { .. }
                | Error::MinLengthBelowMinEntropy { .. }
                | Error::MinLengthBelowSeedLen { .. }
                | Error::MinLengthAboveMaxLength { .. }
                | Error::MaxLengthAboveCeiling { .. }
                | Error::PersonalizationTooLong { .. }
                | Error::AdditionalInputTooLong { .. }
                | Error::Config(_)
        )
    }

    /// Check if error indicates the instance is no longer open
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Error::NotOpen
                | Error::ClosedByInterrupt
                | Error::AsynchronousClose
                | Error::NotInstantiated
                | Error::AlreadyInstantiated
        )
    }

    /// Check if error was raised by cancelling a blocking read
    pub fn is_interruption(&self) -> bool {
        matches!(self, Error::ClosedByInterrupt)
    }

    /// Check if error is non-recoverable for the whole engine
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::MissingAlgorithm(_) | Error::Internal(_))
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<envy::Error> for Error {
    fn from(e: envy::Error) -> Self {
        Error::Config(format!("Failed to parse environment variables: {}", e))
    }
}

impl From<Error> for std::io::Error {
    fn from(e: Error) -> Self {
        use std::io::ErrorKind;

        let kind = match &e {
            Error::NotOpen | Error::AsynchronousClose => ErrorKind::NotConnected,
            // std readers retry `Interrupted`, which would hide the close
            Error::ClosedByInterrupt => ErrorKind::ConnectionAborted,
            err if err.is_configuration_error() => ErrorKind::InvalidInput,
            Error::Unsupported(_) => ErrorKind::Unsupported,
            _ => ErrorKind::Other,
        };
        std::io::Error::new(kind, e)
    }
}
