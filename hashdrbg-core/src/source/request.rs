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

//! Validated entropy requests
//!
//! Every pull of entropy input goes through [`EntropyRequest::supply`], which
//! checks the request against the engine's limits before the source is
//! touched. Violations are caller errors and are never retried.

use super::EntropySource;
use crate::cancel::CancellationToken;
use crate::{Error, Result};
use zeroize::Zeroizing;

/// Engine-side bounds on entropy requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestLimits {
    /// Security strength in bytes
    pub security_strength: usize,
    /// Seed length in bytes
    pub seed_len: usize,
    /// Ceiling for `max_length`
    pub max_entropy_input_len: usize,
}

/// A request for entropy input, lengths in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntropyRequest {
    pub min_entropy: i64,
    pub min_length: i64,
    pub max_length: i64,
}

impl EntropyRequest {
    pub fn new(min_entropy: i64, min_length: i64, max_length: i64) -> Self {
        Self {
            min_entropy,
            min_length,
            max_length,
        }
    }

    /// The request an engine makes for a fresh seed: strength bits of
    /// entropy in at least `seed_len` bytes
    pub fn for_seed(limits: &RequestLimits) -> Self {
        Self::new(
            limits.security_strength as i64,
            limits.seed_len as i64,
            limits.max_entropy_input_len as i64,
        )
    }

    /// Check the request; returns the number of bytes to read
    pub fn validate(&self, limits: &RequestLimits) -> Result<usize> {
        if self.min_entropy < 0 {
            return Err(Error::NegativeMinEntropy(self.min_entropy));
        }
        if self.min_entropy < limits.security_strength as i64 {
            return Err(Error::MinEntropyBelowStrength {
                requested: self.min_entropy,
                strength: limits.security_strength,
            });
        }
        if self.min_length < self.min_entropy {
            return Err(Error::MinLengthBelowMinEntropy {
                min_length: self.min_length,
                min_entropy: self.min_entropy,
            });
        }
        if self.min_length < limits.seed_len as i64 {
            return Err(Error::MinLengthBelowSeedLen {
                min_length: self.min_length,
                seed_len: limits.seed_len,
            });
        }
        if self.min_length > self.max_length {
            return Err(Error::MinLengthAboveMaxLength {
                min_length: self.min_length,
                max_length: self.max_length,
            });
        }
        if self.max_length > limits.max_entropy_input_len as i64 {
            return Err(Error::MaxLengthAboveCeiling {
                max_length: self.max_length,
                ceiling: limits.max_entropy_input_len,
            });
        }

        usize::try_from(self.min_length)
            .map_err(|_| Error::Internal(format!("min_length {} overflows", self.min_length)))
    }

    /// Validate, then read exactly `min_length` bytes from `source`
    pub fn supply(
        &self,
        source: &dyn EntropySource,
        limits: &RequestLimits,
        cancel: &CancellationToken,
    ) -> Result<Zeroizing<Vec<u8>>> {
        let len = self.validate(limits)?;
        let mut entropy = Zeroizing::new(vec![0u8; len]);
        source.read(&mut entropy, cancel)?;
        Ok(entropy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixedSource;
    use proptest::prelude::*;

    const LIMITS: RequestLimits = RequestLimits {
        security_strength: 16,
        seed_len: 32,
        max_entropy_input_len: 1024,
    };

    #[test]
    fn test_negative_min_entropy_touches_nothing() {
        let source = FixedSource::counting();
        let err = EntropyRequest::new(-1, 32, 64)
            .supply(&source, &LIMITS, &CancellationToken::new())
            .unwrap_err();

        assert!(matches!(err, Error::NegativeMinEntropy(-1)));
        assert!(err.is_configuration_error());
        assert_eq!(source.reads(), 0);
    }

    #[test]
    fn test_each_violation_has_its_own_error() {
        let cases = [
            (EntropyRequest::new(-5, 32, 64), "negative"),
            (EntropyRequest::new(8, 32, 64), "strength"),
            (EntropyRequest::new(40, 33, 64), "min_entropy"),
            (EntropyRequest::new(16, 20, 64), "seed_len"),
            (EntropyRequest::new(16, 64, 32), "max_length"),
            (EntropyRequest::new(16, 32, 2048), "ceiling"),
        ];

        for (request, label) in cases {
            let err = request.validate(&LIMITS).unwrap_err();
            let ok = match label {
                "negative" => matches!(err, Error::NegativeMinEntropy(_)),
                "strength" => matches!(err, Error::MinEntropyBelowStrength { .. }),
                "min_entropy" => matches!(err, Error::MinLengthBelowMinEntropy { .. }),
                "seed_len" => matches!(err, Error::MinLengthBelowSeedLen { .. }),
                "max_length" => matches!(err, Error::MinLengthAboveMaxLength { .. }),
                "ceiling" => matches!(err, Error::MaxLengthAboveCeiling { .. }),
                _ => false,
            };
            assert!(ok, "{}: unexpected {:?}", label, err);
        }
    }

    #[test]
    fn test_seed_request_is_valid() {
        let request = EntropyRequest::for_seed(&LIMITS);
        assert_eq!(request.validate(&LIMITS).unwrap(), 32);
    }

    fn valid_request() -> impl Strategy<Value = EntropyRequest> {
        let ceiling = LIMITS.max_entropy_input_len as i64;
        (LIMITS.security_strength as i64..=ceiling)
            .prop_flat_map(move |min_entropy| {
                let floor = min_entropy.max(LIMITS.seed_len as i64);
                (Just(min_entropy), floor..=ceiling)
            })
            .prop_flat_map(move |(min_entropy, min_length)| {
                (Just(min_entropy), Just(min_length), min_length..=ceiling)
            })
            .prop_map(|(e, min, max)| EntropyRequest::new(e, min, max))
    }

    proptest! {
        #[test]
        fn prop_valid_requests_return_min_length(request in valid_request()) {
            let source = FixedSource::counting();
            let bytes = request
                .supply(&source, &LIMITS, &CancellationToken::new())
                .unwrap();

            prop_assert_eq!(bytes.len() as i64, request.min_length);
            let expected: Vec<u8> = (0..bytes.len()).map(|i| i as u8).collect();
            prop_assert_eq!(bytes.to_vec(), expected);
        }

        #[test]
        fn prop_negative_min_entropy(min_entropy in i64::MIN..0, min_length in 0i64..2048) {
            let err = EntropyRequest::new(min_entropy, min_length, 2048)
                .validate(&LIMITS)
                .unwrap_err();
            prop_assert!(matches!(err, Error::NegativeMinEntropy(v) if v == min_entropy));
        }

        #[test]
        fn prop_min_length_above_max_length(
            request in valid_request().prop_filter("room below", |r| r.min_length > LIMITS.seed_len as i64),
        ) {
            let bad = EntropyRequest::new(request.min_entropy, request.min_length, request.min_length - 1);
            let err = bad.validate(&LIMITS).unwrap_err();
            prop_assert!(
                matches!(err, Error::MinLengthAboveMaxLength { .. }),
                "unexpected {:?}", err
            );
        }

        #[test]
        fn prop_max_length_above_ceiling(request in valid_request(), excess in 1i64..10_000) {
            let bad = EntropyRequest::new(
                request.min_entropy,
                request.min_length,
                LIMITS.max_entropy_input_len as i64 + excess,
            );
            let err = bad.validate(&LIMITS).unwrap_err();
            prop_assert!(matches!(err, Error::MaxLengthAboveCeiling { .. }), "unexpected {:?}", err);
        }
    }
}
