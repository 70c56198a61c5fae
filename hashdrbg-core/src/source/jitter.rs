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

//! Entropy harvested from thread-scheduling jitter
//!
//! A background harvester thread repeatedly busy-waits for a fixed wall-clock
//! quantum while short-lived noise threads compete for the CPU. The number of
//! loop iterations completed inside each quantum depends on preemptions the
//! harvester cannot predict. Each count is folded through a fixed permutation
//! and XORed into an accumulator; after enough quanta the accumulator becomes
//! one harvested byte and is pushed into a bounded [`RingBuffer`].

use super::ring::{RingBuffer, WatermarkLevel};
use super::EntropySource;
use crate::cancel::CancellationToken;
use crate::traits::Lifecycle;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Spins performed by each noise thread
const NOISE_SPINS: u32 = 2_000;

/// Fixed, pre-mixed permutation of 0..=255
const PERMUTATION: [u8; 256] = [
    0x92, 0xe5, 0x25, 0xfa, 0xd9, 0xef, 0x5b, 0x5c, 0x27, 0x72, 0xd7, 0x1a, 0x7f, 0x35, 0x23, 0xeb,
    0x8e, 0xd3, 0x09, 0x95, 0x26, 0x46, 0x6f, 0x62, 0xf9, 0x1b, 0x3d, 0x65, 0x00, 0xad, 0xaa, 0x6d,
    0x86, 0x55, 0x48, 0xa4, 0x51, 0xb2, 0x03, 0x7d, 0x73, 0x13, 0xe9, 0x1d, 0x41, 0xc2, 0x79, 0xd0,
    0x61, 0x80, 0x82, 0x2b, 0xf0, 0x01, 0x84, 0x3b, 0xcc, 0x19, 0x71, 0x1c, 0x8a, 0xee, 0x36, 0x04,
    0xd6, 0x2e, 0xb1, 0x08, 0x4b, 0x78, 0x40, 0x16, 0x8f, 0x89, 0x87, 0x59, 0xba, 0x17, 0x7a, 0xcd,
    0x53, 0x20, 0x67, 0xe3, 0x31, 0xfe, 0xbf, 0x7e, 0x5a, 0x56, 0x58, 0xf1, 0x94, 0xd2, 0x75, 0x11,
    0xbc, 0x90, 0xf8, 0x50, 0x28, 0x2f, 0xf2, 0x12, 0xe8, 0x39, 0x0a, 0xa1, 0x60, 0x9f, 0x9d, 0x18,
    0x9a, 0x6a, 0xcb, 0x81, 0x4f, 0x1f, 0x0f, 0x2a, 0xea, 0xa6, 0x42, 0x3e, 0xf5, 0x1e, 0xff, 0xc0,
    0x93, 0x54, 0x64, 0xb8, 0xf6, 0xa3, 0xcf, 0xd8, 0x88, 0xe7, 0x6b, 0x06, 0xdc, 0x8b, 0xbd, 0x85,
    0x9c, 0x44, 0x99, 0xa0, 0x8d, 0x2d, 0x02, 0xf4, 0x07, 0xa7, 0x4e, 0x32, 0x57, 0xab, 0x2c, 0xc6,
    0xce, 0xfd, 0xb5, 0xe4, 0xda, 0xc5, 0x98, 0x47, 0x49, 0x33, 0x37, 0x0d, 0x38, 0x4c, 0xb4, 0x9b,
    0x5e, 0x45, 0xfc, 0xc1, 0xa8, 0xdf, 0xa5, 0x63, 0xed, 0xbb, 0x68, 0x0c, 0x6c, 0x66, 0x24, 0xbe,
    0xe6, 0x10, 0x34, 0xc4, 0x43, 0xb9, 0xca, 0x15, 0x0b, 0x22, 0x52, 0x74, 0x14, 0x9e, 0xd5, 0xa2,
    0x69, 0xf3, 0xac, 0x97, 0x30, 0x05, 0x5d, 0xd1, 0xb0, 0x91, 0x7c, 0x3a, 0x0e, 0xdd, 0x21, 0x70,
    0x3f, 0xc3, 0x8c, 0x96, 0xe1, 0xf7, 0xc8, 0xa9, 0x7b, 0x3c, 0x77, 0xaf, 0x83, 0x4a, 0xb7, 0x76,
    0xc7, 0xb3, 0xe2, 0xdb, 0x5f, 0x6e, 0xfb, 0x4d, 0xb6, 0xe0, 0xd4, 0xae, 0xc9, 0xec, 0xde, 0x29,
];

/// Harvester tuning
///
/// The quantum and iteration thresholds are empirical defaults, not derived
/// bounds.
#[derive(Debug, Clone)]
pub struct JitterConfig {
    /// Ring capacity in bytes
    pub capacity: usize,
    /// Busy-wait duration per sample
    pub quantum: Duration,
    /// Minimum quanta folded into one byte
    pub min_quanta: u32,
    /// Minimum cumulative iterations folded into one byte
    pub min_iterations: u64,
    /// Noise threads spawned per quantum
    pub noise_threads: usize,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            capacity: 64,
            quantum: Duration::from_millis(1),
            min_quanta: 6,
            min_iterations: 64_000,
            noise_threads: 4,
        }
    }
}

impl JitterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config("jitter capacity must be > 0".to_string()));
        }
        if self.quantum.is_zero() {
            return Err(Error::Config("jitter quantum must be > 0".to_string()));
        }
        if self.min_quanta == 0 {
            return Err(Error::Config("jitter min_quanta must be > 0".to_string()));
        }
        Ok(())
    }
}

/// Entropy source backed by a scheduler-jitter harvester thread
pub struct SchedulerJitterSource {
    ring: Arc<RingBuffer>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    open: AtomicBool,
    config: JitterConfig,
}

impl SchedulerJitterSource {
    /// Validate `config` and start the harvester thread
    pub fn new(config: JitterConfig) -> Result<Self> {
        config.validate()?;

        let ring = Arc::new(RingBuffer::new(config.capacity));
        let stop = Arc::new(AtomicBool::new(false));

        let worker = {
            let ring = Arc::clone(&ring);
            let stop = Arc::clone(&stop);
            let config = config.clone();
            std::thread::Builder::new()
                .name("jitter-harvester".to_string())
                .spawn(move || harvest_loop(&config, &ring, &stop))
                .map_err(|e| Error::Unsupported(format!("cannot spawn harvester: {}", e)))?
        };

        info!(
            capacity = config.capacity,
            quantum_micros = config.quantum.as_micros() as u64,
            "Scheduler jitter harvester started"
        );

        Ok(Self {
            ring,
            stop,
            worker: Mutex::new(Some(worker)),
            open: AtomicBool::new(true),
            config,
        })
    }

    /// Harvested bytes waiting to be read
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Whether the background thread is still running
    pub fn is_harvesting(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    pub fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    pub fn config(&self) -> &JitterConfig {
        &self.config
    }
}

impl Lifecycle for SchedulerJitterSource {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Stop the harvester, wait for it to exit, then wipe the ring
    fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }

        self.stop.store(true, Ordering::SeqCst);
        self.ring.close();

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!("Jitter harvester thread panicked");
            }
        }

        self.ring.wipe();
        info!("Scheduler jitter harvester stopped");
    }
}

impl EntropySource for SchedulerJitterSource {
    fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        if self.ring.watermark() == WatermarkLevel::Low {
            debug!(
                buffered = self.ring.len(),
                requested = dest.len(),
                "Jitter ring nearly empty, read will wait on the harvester"
            );
        }

        match self.ring.pop_into(dest, cancel) {
            Err(Error::ClosedByInterrupt) => {
                warn!("Jitter read interrupted, closing source");
                self.close();
                Err(Error::ClosedByInterrupt)
            }
            other => other,
        }
    }

    fn recommended_buffer_size(&self) -> usize {
        32
    }

    fn name(&self) -> &'static str {
        "scheduler-jitter"
    }
}

impl Drop for SchedulerJitterSource {
    fn drop(&mut self) {
        self.close();
    }
}

fn harvest_loop(config: &JitterConfig, ring: &RingBuffer, stop: &AtomicBool) {
    while let Some(byte) = harvest_byte(config, stop) {
        if ring.push(byte).is_err() {
            break;
        }
    }
    debug!("Harvester loop exited");
}

/// Fold quanta into one byte; `None` once `stop` is raised
fn harvest_byte(config: &JitterConfig, stop: &AtomicBool) -> Option<u8> {
    let mut acc = 0u8;
    let mut quanta = 0u32;
    let mut iterations = 0u64;

    while quanta < config.min_quanta || iterations < config.min_iterations {
        if stop.load(Ordering::SeqCst) {
            return None;
        }

        let count = sample_quantum(config);
        acc ^= fold(count);
        quanta += 1;
        iterations = iterations.saturating_add(count);
    }

    Some(acc)
}

/// Busy-wait one quantum alongside noise threads, counting iterations
fn sample_quantum(config: &JitterConfig) -> u64 {
    crossbeam::scope(|s| {
        for _ in 0..config.noise_threads {
            s.spawn(|_| noise());
        }
        busy_wait(config.quantum)
    })
    .unwrap_or_else(|_| busy_wait(config.quantum))
}

fn busy_wait(quantum: Duration) -> u64 {
    let start = Instant::now();
    let mut count = 0u64;
    while start.elapsed() < quantum {
        count = count.wrapping_add(1);
    }
    count
}

fn noise() {
    let mut x = 0u32;
    for i in 0..NOISE_SPINS {
        x = std::hint::black_box(x.wrapping_mul(31).wrapping_add(i));
        if i % 256 == 0 {
            std::thread::yield_now();
        }
    }
}

fn fold(count: u64) -> u8 {
    count
        .to_le_bytes()
        .iter()
        .fold(0u8, |v, &b| PERMUTATION[(v ^ b) as usize])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> JitterConfig {
        JitterConfig {
            capacity: 8,
            quantum: Duration::from_micros(200),
            min_quanta: 2,
            min_iterations: 100,
            noise_threads: 1,
        }
    }

    #[test]
    fn test_permutation_is_bijective() {
        let mut seen = [false; 256];
        for &v in PERMUTATION.iter() {
            assert!(!seen[v as usize]);
            seen[v as usize] = true;
        }
    }

    #[test]
    fn test_fold_depends_on_every_byte() {
        assert_ne!(fold(0x01), fold(0x0100));
        assert_ne!(fold(0), fold(1 << 56));
    }

    #[test]
    fn test_harvest_byte_honours_thresholds() {
        let config = quick_config();
        let stop = AtomicBool::new(false);
        let start = Instant::now();
        assert!(harvest_byte(&config, &stop).is_some());
        assert!(start.elapsed() >= config.quantum * config.min_quanta);
    }

    #[test]
    fn test_harvest_byte_stops() {
        let stop = AtomicBool::new(true);
        assert_eq!(harvest_byte(&quick_config(), &stop), None);
    }

    #[test]
    fn test_read_fills_buffer() {
        let source = SchedulerJitterSource::new(quick_config()).unwrap();
        let mut out = [0u8; 16];
        source.read(&mut out, &CancellationToken::new()).unwrap();
        assert!(source.is_open());
        source.close();
    }

    #[test]
    fn test_ring_never_exceeds_capacity() {
        let source = SchedulerJitterSource::new(quick_config()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(10);

        while source.buffered() < source.config().capacity && Instant::now() < deadline {
            assert!(source.buffered() <= source.config().capacity);
            std::thread::sleep(Duration::from_millis(5));
        }
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(source.buffered(), source.config().capacity);
        assert!(source.ring().stats().producer_waits >= 1);
    }

    #[test]
    fn test_shutdown_is_bounded() {
        let source = SchedulerJitterSource::new(quick_config()).unwrap();
        assert!(source.is_harvesting());

        let start = Instant::now();
        source.close();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert!(!source.is_harvesting());
        assert_eq!(source.buffered(), 0);

        let mut out = [0u8; 1];
        let err = source.read(&mut out, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, Error::NotOpen));
    }

    #[test]
    fn test_interrupt_closes_source() {
        let config = JitterConfig {
            quantum: Duration::from_millis(5),
            min_quanta: 50,
            ..quick_config()
        };
        let source = SchedulerJitterSource::new(config).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let mut out = [0u8; 4];
        let err = source.read(&mut out, &token).unwrap_err();
        assert!(err.is_interruption());
        assert!(!source.is_open());
        assert!(!source.is_harvesting());
    }

    #[test]
    fn test_invalid_config() {
        let config = JitterConfig {
            capacity: 0,
            ..JitterConfig::default()
        };
        assert!(SchedulerJitterSource::new(config).is_err());
    }
}
