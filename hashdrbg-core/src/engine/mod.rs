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

//! CSPRNG engine
//!
//! An [`Engine`] moves through `Uninstantiated -> Instantiated -> Closed`.
//! Instantiate pulls `seed_len` bytes of entropy, a nonce and the
//! personalization string, runs them through [`HashDf`] and hands the seed to
//! a [`Backend`]. Reseed does the same with the request counter, fresh
//! entropy and additional input. Every operation that touches working state
//! runs under one lock, so generate and reseed never interleave.
//!
//! A failed instantiate or reseed leaves the previous phase untouched: the new
//! backend is built completely before it replaces the old one. The only
//! failure that changes the phase is an interrupted entropy read, which always
//! closes the engine.

mod chain;
mod system;

pub use chain::DigestChain;
pub use system::SystemBackend;

use crate::cancel::CancellationToken;
use crate::clock::{Clock, SystemClock};
use crate::config::DrbgConfig;
use crate::derivation::HashDf;
use crate::digest::HashAlgorithm;
use crate::metrics::EngineMetrics;
use crate::nonce::NonceGenerator;
use crate::selftest::{CompressionTest, SelfTestReport};
use crate::source::{EntropyRequest, EntropySource};
use crate::traits::{ByteSource, Lifecycle, Reseedable};
use crate::{Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Byte-production algorithm operating on a derived seed
pub trait Backend: Send {
    /// Fill `out` completely, advancing internal state
    fn generate(&mut self, out: &mut [u8]) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hash-chained working state (default)
    DigestChain,
    /// Operating system generator, no working state of its own
    Os,
}

impl Default for BackendKind {
    fn default() -> Self {
        Self::DigestChain
    }
}

impl BackendKind {
    /// Initialise a backend of this kind from a derived seed
    pub fn create(
        self,
        algorithm: HashAlgorithm,
        seed: &[u8],
        cycle_len: u64,
    ) -> Result<Box<dyn Backend>> {
        match self {
            Self::DigestChain => Ok(Box::new(DigestChain::new(algorithm, seed, cycle_len))),
            Self::Os => Ok(Box::new(SystemBackend::new(seed)?)),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "digest-chain" | "chain" => Ok(Self::DigestChain),
            "os" | "system" => Ok(Self::Os),
            other => Err(Error::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Secret state owned by an instantiated engine
struct WorkingState {
    backend: Box<dyn Backend>,
    request_counter: u64,
}

enum Phase {
    Uninstantiated,
    Instantiated(WorkingState),
    Closed,
}

/// Everything guarded by the engine lock
struct EngineCore {
    df: HashDf,
    nonce: NonceGenerator,
    phase: Phase,
}

/// Hash-based CSPRNG engine
pub struct Engine {
    id: Uuid,
    config: DrbgConfig,
    backend_kind: BackendKind,
    source: Arc<dyn EntropySource>,
    personalization: Zeroizing<Vec<u8>>,
    cancel: Mutex<CancellationToken>,
    metrics: EngineMetrics,
    core: Mutex<EngineCore>,
}

/// Builder for [`Engine`]
pub struct EngineBuilder {
    config: DrbgConfig,
    source: Option<Arc<dyn EntropySource>>,
    personalization: Option<Vec<u8>>,
    clock: Option<Arc<dyn Clock>>,
    backend: Option<BackendKind>,
}

impl EngineBuilder {
    /// Entropy source to draw from instead of opening `config.source`
    pub fn source(mut self, source: Arc<dyn EntropySource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Explicit personalization string
    pub fn personalization(mut self, personalization: impl Into<Vec<u8>>) -> Self {
        self.personalization = Some(personalization.into());
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Override `config.backend`
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<Engine> {
        let config = self.config;
        config.validate()?;

        let source = match self.source {
            Some(source) => source,
            None => config.source.open(&config)?,
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let id = Uuid::new_v4();

        let personalization = match self.personalization {
            Some(explicit) => explicit,
            None => match &config.personalization {
                Some(configured) => configured.as_bytes().to_vec(),
                None => auto_personalization(&id, clock.as_ref(), config.max_personalization_len),
            },
        };
        if personalization.len() > config.max_personalization_len {
            return Err(Error::PersonalizationTooLong {
                len: personalization.len(),
                max: config.max_personalization_len,
            });
        }

        let backend_kind = self.backend.unwrap_or(config.backend);
        let core = EngineCore {
            df: HashDf::new(config.algorithm, config.seed_len(), clock.as_ref()),
            nonce: NonceGenerator::new(
                config.algorithm,
                config.security_strength(),
                source.clone(),
                clock,
            ),
            phase: Phase::Uninstantiated,
        };

        info!(
            engine = %id,
            algorithm = %config.algorithm,
            seed_len = config.seed_len(),
            backend = ?backend_kind,
            source = source.name(),
            "Engine constructed"
        );

        Ok(Engine {
            id,
            config,
            backend_kind,
            source,
            personalization: Zeroizing::new(personalization),
            cancel: Mutex::new(CancellationToken::new()),
            metrics: EngineMetrics::new(),
            core: Mutex::new(core),
        })
    }
}

/// Instance id, process id and current time, truncated to `max` bytes
fn auto_personalization(id: &Uuid, clock: &dyn Clock, max: usize) -> Vec<u8> {
    let mut personalization = Vec::with_capacity(28);
    personalization.extend_from_slice(id.as_bytes());
    personalization.extend_from_slice(&std::process::id().to_be_bytes());
    personalization.extend_from_slice(&clock.nanos().to_be_bytes());
    personalization.truncate(max);
    personalization
}

impl Engine {
    pub fn builder(config: DrbgConfig) -> EngineBuilder {
        EngineBuilder {
            config,
            source: None,
            personalization: None,
            clock: None,
            backend: None,
        }
    }

    /// Engine with the source, backend and personalization named by `config`
    pub fn from_config(config: DrbgConfig) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &DrbgConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend_kind
    }

    pub fn source(&self) -> &Arc<dyn EntropySource> {
        &self.source
    }

    pub fn security_strength(&self) -> usize {
        self.config.security_strength()
    }

    pub fn seed_len(&self) -> usize {
        self.config.seed_len()
    }

    pub fn personalization(&self) -> &[u8] {
        &self.personalization
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn is_instantiated(&self) -> bool {
        matches!(self.core.lock().phase, Phase::Instantiated(_))
    }

    /// Generate calls since the last instantiate or reseed
    pub fn request_counter(&self) -> Option<u64> {
        match &self.core.lock().phase {
            Phase::Instantiated(state) => Some(state.request_counter),
            _ => None,
        }
    }

    /// Token checked by every entropy read this engine performs
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.lock().clone()
    }

    /// Interrupt any blocked entropy read
    ///
    /// The interrupted operation fails with `ClosedByInterrupt` and the
    /// engine closes. Does not wait for the engine lock.
    pub fn interrupt(&self) {
        warn!(engine = %self.id, "Interrupt requested");
        self.cancel.lock().cancel();
    }

    /// Build initial working state
    pub fn instantiate(&self) -> Result<()> {
        let mut core = self.core.lock();
        let cancel = self.cancellation_token();

        match core.phase {
            Phase::Closed => return Err(Error::NotOpen),
            Phase::Instantiated(_) => return Err(Error::AlreadyInstantiated),
            Phase::Uninstantiated => {}
        }

        let result = self.instantiate_locked(&mut core, &cancel);
        self.settle(&mut core, result)
    }

    /// Fill `out` with output bytes, instantiating first if needed
    pub fn generate(&self, out: &mut [u8]) -> Result<()> {
        let mut core = self.core.lock();
        let cancel = self.cancellation_token();

        let result = self.generate_locked(&mut core, out, &cancel);
        match &result {
            Ok(()) => self.metrics.record_generate(out.len()),
            Err(_) => self.metrics.record_generate_failure(),
        }
        self.settle(&mut core, result)
    }

    /// Allocate and fill `len` output bytes
    pub fn next_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.generate(&mut out)?;
        Ok(out)
    }

    /// Refresh working state with new entropy
    ///
    /// Without `additional_input`, a fresh nonce followed by the
    /// personalization string is mixed in instead.
    pub fn reseed(&self, additional_input: Option<&[u8]>) -> Result<()> {
        if let Some(input) = additional_input {
            if input.len() > self.config.max_additional_input_len {
                return Err(Error::AdditionalInputTooLong {
                    len: input.len(),
                    max: self.config.max_additional_input_len,
                });
            }
        }

        let mut core = self.core.lock();
        let cancel = self.cancellation_token();

        let result = self.reseed_locked(&mut core, additional_input, &cancel);
        self.settle(&mut core, result)
    }

    /// Erase working state; later operations fail with `NotOpen`
    pub fn close(&self) {
        let mut core = self.core.lock();
        self.close_locked(&mut core);
    }

    /// Return to `Uninstantiated` from any phase, with a fresh cancellation token
    ///
    /// Working state is erased first. The entropy source is reused as is, so
    /// a source closed by an interruption keeps failing with `NotOpen`.
    pub fn reset(&self) {
        let mut core = self.core.lock();
        self.reset_locked(&mut core);
    }

    fn reset_locked(&self, core: &mut EngineCore) {
        core.phase = Phase::Uninstantiated;
        core.nonce.wipe();
        *self.cancel.lock() = CancellationToken::new();
        info!(engine = %self.id, "Engine reset");
    }

    /// Generate `self_test_sample_len` bytes and run the compressibility test
    pub fn self_test(&self) -> Result<SelfTestReport> {
        let sample = Zeroizing::new(self.next_bytes(self.config.self_test_sample_len)?);
        let report = CompressionTest::default().check(&sample)?;

        if report.suspicious {
            warn!(
                engine = %self.id,
                ratio = report.ratio,
                "Self-test sample is suspiciously compressible"
            );
        } else {
            debug!(engine = %self.id, ratio = report.ratio, "Self-test passed");
        }
        Ok(report)
    }

    fn instantiate_locked(&self, core: &mut EngineCore, cancel: &CancellationToken) -> Result<()> {
        let limits = self.config.request_limits();
        let entropy =
            EntropyRequest::for_seed(&limits).supply(self.source.as_ref(), &limits, cancel)?;
        let nonce = core.nonce.generate(cancel)?;

        let mut material = Zeroizing::new(Vec::with_capacity(
            entropy.len() + nonce.len() + self.personalization.len(),
        ));
        material.extend_from_slice(&entropy);
        material.extend_from_slice(&nonce);
        material.extend_from_slice(&self.personalization);

        let seed = core.df.derive(&material)?;
        let backend = self
            .backend_kind
            .create(self.config.algorithm, &seed, self.config.chain_cycle_len)?;

        info!(
            engine = %self.id,
            backend = backend.name(),
            entropy_bytes = entropy.len(),
            "Engine instantiated"
        );
        core.phase = Phase::Instantiated(WorkingState {
            backend,
            request_counter: 0,
        });
        self.metrics.record_instantiate(entropy.len());
        Ok(())
    }

    fn generate_locked(
        &self,
        core: &mut EngineCore,
        out: &mut [u8],
        cancel: &CancellationToken,
    ) -> Result<()> {
        match core.phase {
            Phase::Closed => return Err(Error::NotOpen),
            Phase::Uninstantiated => self.instantiate_locked(core, cancel)?,
            Phase::Instantiated(_) => {
                if self.reseed_due(&core.phase) {
                    debug!(engine = %self.id, "Reseed interval reached");
                    self.reseed_locked(core, None, cancel)?;
                }
            }
        }

        let Phase::Instantiated(state) = &mut core.phase else {
            return Err(Error::Internal("working state missing after instantiate".into()));
        };
        state.backend.generate(out)?;
        state.request_counter = state.request_counter.wrapping_add(1);
        Ok(())
    }

    fn reseed_due(&self, phase: &Phase) -> bool {
        match (phase, self.config.reseed_interval) {
            (Phase::Instantiated(state), Some(interval)) => state.request_counter >= interval,
            _ => false,
        }
    }

    fn reseed_locked(
        &self,
        core: &mut EngineCore,
        additional_input: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let request_counter = match &core.phase {
            Phase::Instantiated(state) => state.request_counter,
            Phase::Uninstantiated => return Err(Error::NotInstantiated),
            Phase::Closed => return Err(Error::NotOpen),
        };

        let limits = self.config.request_limits();
        let entropy =
            EntropyRequest::for_seed(&limits).supply(self.source.as_ref(), &limits, cancel)?;

        let additional = match additional_input {
            Some(input) => Zeroizing::new(input.to_vec()),
            None => {
                let nonce = core.nonce.generate(cancel)?;
                let mut derived = Zeroizing::new(nonce.to_vec());
                derived.extend_from_slice(&self.personalization);
                derived
            }
        };

        let mut material =
            Zeroizing::new(Vec::with_capacity(8 + entropy.len() + additional.len()));
        material.extend_from_slice(&request_counter.to_be_bytes());
        material.extend_from_slice(&entropy);
        material.extend_from_slice(&additional);

        let seed = core.df.derive(&material)?;
        let backend = self
            .backend_kind
            .create(self.config.algorithm, &seed, self.config.chain_cycle_len)?;

        debug!(
            engine = %self.id,
            previous_requests = request_counter,
            "Engine reseeded"
        );
        core.phase = Phase::Instantiated(WorkingState {
            backend,
            request_counter: 0,
        });
        self.metrics.record_reseed(entropy.len());
        Ok(())
    }

    fn close_locked(&self, core: &mut EngineCore) {
        if matches!(core.phase, Phase::Closed) {
            return;
        }
        // Dropping the working state zeroizes the backend
        core.phase = Phase::Closed;
        core.nonce.wipe();
        info!(engine = %self.id, "Engine closed");
    }

    /// Close on interruption, pass every result through
    fn settle<T>(&self, core: &mut EngineCore, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_interruption() {
                warn!(engine = %self.id, "Entropy read interrupted, closing engine");
                self.metrics.record_interruption();
                self.close_locked(core);
            }
        }
        result
    }
}

impl ByteSource for Engine {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.generate(dest)
    }
}

impl Lifecycle for Engine {
    fn is_open(&self) -> bool {
        !matches!(self.core.lock().phase, Phase::Closed)
    }

    fn close(&self) {
        Engine::close(self);
    }
}

impl Reseedable for Engine {
    fn reseed(&self, additional_input: Option<&[u8]>) -> Result<()> {
        Engine::reseed(self, additional_input)
    }
}

impl rand::RngCore for Engine {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_le_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_le_bytes(buf)
    }

    /// # Panics
    ///
    /// Panics when the engine cannot generate, for example after close. Use
    /// `try_fill_bytes` to handle that case.
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        if let Err(e) = self.generate(dest) {
            panic!("engine failed to generate: {}", e);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.generate(dest).map_err(rand::Error::new)
    }
}

impl rand::CryptoRng for Engine {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::source::{FixedSource, StreamSource};
    use std::collections::HashSet;
    use std::io::Read;
    use std::time::Duration;

    fn sha256_config() -> DrbgConfig {
        DrbgConfig {
            algorithm: HashAlgorithm::Sha256,
            ..Default::default()
        }
    }

    fn engine_with(source: Arc<FixedSource>, config: DrbgConfig) -> Engine {
        Engine::builder(config)
            .source(source)
            .personalization(b"engine-test".to_vec())
            .clock(Arc::new(FixedClock::new(7)))
            .build()
            .unwrap()
    }

    fn engine() -> Engine {
        engine_with(Arc::new(FixedSource::counting()), sha256_config())
    }

    #[test]
    fn test_generate_twice_differs() {
        let engine = engine();
        assert_eq!(engine.seed_len(), 32);
        assert_eq!(engine.security_strength(), 16);

        let a = engine.next_bytes(20).unwrap();
        let b = engine.next_bytes(20).unwrap();
        assert_eq!(a.len(), 20);
        assert_eq!(b.len(), 20);
        assert_ne!(a, b);
        assert_eq!(engine.request_counter(), Some(2));
    }

    #[test]
    fn test_generate_auto_instantiates() {
        let engine = engine();
        assert!(!engine.is_instantiated());
        engine.next_bytes(1).unwrap();
        assert!(engine.is_instantiated());
        assert_eq!(engine.metrics().instantiations(), 1);
        assert!(matches!(engine.instantiate(), Err(Error::AlreadyInstantiated)));
    }

    #[test]
    fn test_reseed_then_generate_is_deterministic() {
        let run = || {
            let engine = engine_with(Arc::new(FixedSource::new(vec![3, 1, 4, 1, 5])), sha256_config());
            engine.instantiate().unwrap();
            engine.reseed(Some(b"fixed additional input")).unwrap();
            engine.next_bytes(64).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_reseed_changes_output_and_resets_counter() {
        let a = engine();
        let b = engine();
        a.next_bytes(16).unwrap();
        b.next_bytes(16).unwrap();

        b.reseed(None).unwrap();
        assert_eq!(b.request_counter(), Some(0));
        assert_eq!(b.metrics().reseeds(), 1);
        assert_ne!(a.next_bytes(32).unwrap(), b.next_bytes(32).unwrap());
    }

    #[test]
    fn test_reseed_requires_instantiation() {
        let engine = engine();
        assert!(matches!(engine.reseed(None), Err(Error::NotInstantiated)));
    }

    #[test]
    fn test_additional_input_too_long_touches_nothing() {
        let source = Arc::new(FixedSource::counting());
        let engine = engine_with(source.clone(), sha256_config());
        engine.instantiate().unwrap();
        let reads = source.reads();

        let err = engine.reseed(Some(&[0u8; 257])).unwrap_err();
        assert!(matches!(err, Error::AdditionalInputTooLong { len: 257, max: 256 }));
        assert_eq!(source.reads(), reads);
    }

    #[test]
    fn test_personalization_too_long() {
        let result = Engine::builder(sha256_config())
            .source(Arc::new(FixedSource::counting()))
            .personalization(vec![0u8; 65])
            .build();
        assert!(matches!(
            result,
            Err(Error::PersonalizationTooLong { len: 65, max: 64 })
        ));
    }

    #[test]
    fn test_auto_personalization_is_unique() {
        let build = || {
            Engine::builder(sha256_config())
                .source(Arc::new(FixedSource::counting()))
                .build()
                .unwrap()
        };
        let a = build();
        let b = build();
        assert_eq!(a.personalization().len(), 28);
        assert_ne!(a.personalization(), b.personalization());
    }

    #[test]
    fn test_close_is_terminal_until_reset() {
        let engine = engine();
        engine.next_bytes(8).unwrap();
        engine.close();

        assert!(!engine.is_open());
        assert!(matches!(engine.next_bytes(8), Err(Error::NotOpen)));
        assert!(matches!(engine.reseed(None), Err(Error::NotOpen)));
        assert!(matches!(engine.instantiate(), Err(Error::NotOpen)));
        assert_eq!(engine.request_counter(), None);

        engine.close();
        assert!(!engine.is_open());
    }

    #[test]
    fn test_reset_round_trip_passes_self_test() {
        let engine = Engine::builder(sha256_config())
            .source(Arc::new(FixedSource::counting()))
            .build()
            .unwrap();
        let before = engine.next_bytes(2048).unwrap();
        engine.close();
        engine.reset();

        assert!(engine.is_open());
        assert!(!engine.is_instantiated());
        let after = engine.next_bytes(2048).unwrap();
        assert_ne!(before, after);

        let report = engine.self_test().unwrap();
        assert_eq!(report.sample_len, 2048);
        assert!(!report.suspicious);
        let combined: Vec<u8> = before.iter().chain(after.iter()).copied().collect();
        assert!(!CompressionTest::default().check(&combined).unwrap().suspicious);
    }

    #[test]
    fn test_failed_instantiate_leaves_engine_uninstantiated() {
        let source = Arc::new(FixedSource::counting());
        let engine = engine_with(source.clone(), sha256_config());
        source.close();

        assert!(matches!(engine.instantiate(), Err(Error::NotOpen)));
        assert!(engine.is_open());
        assert!(!engine.is_instantiated());
    }

    #[test]
    fn test_failed_reseed_keeps_working_state() {
        let source = Arc::new(FixedSource::counting());
        let twin_source = Arc::new(FixedSource::counting());
        let engine = engine_with(source.clone(), sha256_config());
        let twin = engine_with(twin_source, sha256_config());

        assert_eq!(engine.next_bytes(32).unwrap(), twin.next_bytes(32).unwrap());

        source.close();
        assert!(matches!(engine.reseed(Some(b"x")), Err(Error::NotOpen)));
        assert!(engine.is_instantiated());
        assert_eq!(engine.request_counter(), Some(1));
        assert_eq!(engine.next_bytes(32).unwrap(), twin.next_bytes(32).unwrap());
    }

    #[test]
    fn test_interrupt_closes_engine() {
        let source = Arc::new(FixedSource::counting());
        let engine = engine_with(source.clone(), sha256_config());
        engine.interrupt();

        assert!(matches!(engine.next_bytes(8), Err(Error::ClosedByInterrupt)));
        assert!(!engine.is_open());
        assert!(!source.is_open());
        assert_eq!(engine.metrics().interruptions(), 1);
        assert!(matches!(engine.next_bytes(8), Err(Error::NotOpen)));
    }

    struct Slow;

    impl Read for Slow {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            if buf.is_empty() {
                return Ok(0);
            }
            buf[0] = 0xA5;
            Ok(1)
        }
    }

    #[test]
    fn test_interrupt_blocked_read() {
        let source: Arc<dyn EntropySource> = Arc::new(StreamSource::new("slow", Slow));
        let engine = Engine::builder(sha256_config())
            .source(source.clone())
            .build()
            .unwrap();

        crossbeam::scope(|s| {
            let handle = s.spawn(|_| engine.next_bytes(16));
            std::thread::sleep(Duration::from_millis(40));
            engine.interrupt();

            let result = handle.join().unwrap();
            assert!(matches!(result, Err(Error::ClosedByInterrupt)));
        })
        .unwrap();

        assert!(!engine.is_open());
        assert!(!source.is_open());
    }

    #[test]
    fn test_queued_caller_uses_token_after_reset() {
        let engine = engine();

        crossbeam::scope(|s| {
            let mut core = engine.core.lock();
            let queued = s.spawn(|_| engine.next_bytes(16));
            std::thread::sleep(Duration::from_millis(50));

            engine.interrupt();
            engine.reset_locked(&mut core);
            drop(core);

            assert_eq!(queued.join().unwrap().unwrap().len(), 16);
        })
        .unwrap();

        assert!(engine.is_open());
        assert!(!engine.cancellation_token().is_cancelled());
        assert_eq!(engine.metrics().interruptions(), 0);
    }

    #[test]
    fn test_reseed_interval() {
        let config = DrbgConfig {
            reseed_interval: Some(2),
            ..sha256_config()
        };
        let engine = engine_with(Arc::new(FixedSource::counting()), config);

        for _ in 0..5 {
            engine.next_bytes(8).unwrap();
        }
        assert_eq!(engine.metrics().instantiations(), 1);
        assert_eq!(engine.metrics().reseeds(), 2);
        assert_eq!(engine.request_counter(), Some(1));
    }

    #[test]
    fn test_concurrent_generate() {
        const THREADS: usize = 8;
        const CHUNKS: usize = 50;
        const CHUNK_LEN: usize = 32;

        let engine = engine();
        let chunks = Mutex::new(Vec::new());

        crossbeam::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|_| {
                    for _ in 0..CHUNKS {
                        let chunk = engine.next_bytes(CHUNK_LEN).unwrap();
                        chunks.lock().push(chunk);
                    }
                });
            }
        })
        .unwrap();

        let chunks = chunks.into_inner();
        let total: usize = chunks.iter().map(Vec::len).sum();
        assert_eq!(total, THREADS * CHUNKS * CHUNK_LEN);
        assert_eq!(engine.metrics().bytes_generated(), total as u64);

        let unique: HashSet<Vec<u8>> = chunks.into_iter().collect();
        assert_eq!(unique.len(), THREADS * CHUNKS);
    }

    #[test]
    fn test_os_backend() {
        let engine = Engine::builder(sha256_config())
            .source(Arc::new(FixedSource::counting()))
            .backend(BackendKind::Os)
            .build()
            .unwrap();
        assert_eq!(engine.backend_kind(), BackendKind::Os);

        let a = engine.next_bytes(32).unwrap();
        let b = engine.next_bytes(32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rng_core() {
        use rand::Rng;

        let mut engine = engine();
        let values: Vec<u64> = (0..4).map(|_| engine.gen()).collect();
        assert_ne!(values[0], values[1]);

        engine.close();
        let mut buf = [0u8; 4];
        assert!(rand::RngCore::try_fill_bytes(&mut engine, &mut buf).is_err());
    }

    #[test]
    fn test_rng_words_follow_byte_stream() {
        use rand::RngCore;

        let mut engine = engine();
        let twin = self::engine();

        let word = engine.next_u32();
        assert_eq!(word.to_le_bytes().to_vec(), twin.next_bytes(4).unwrap());

        let wide = engine.next_u64();
        assert_eq!(wide.to_le_bytes().to_vec(), twin.next_bytes(8).unwrap());
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("digest_chain".parse::<BackendKind>().unwrap(), BackendKind::DigestChain);
        assert_eq!("OS".parse::<BackendKind>().unwrap(), BackendKind::Os);
        assert!("aes".parse::<BackendKind>().is_err());
    }
}
