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

//! Engine metrics collection and reporting

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Per-engine counters
#[derive(Clone)]
pub struct EngineMetrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    start_time: Instant,

    // Lifecycle
    instantiations: AtomicU64,
    reseeds: AtomicU64,
    interruptions: AtomicU64,

    // Output
    generate_calls: AtomicU64,
    generate_failures: AtomicU64,
    bytes_generated: AtomicU64,

    // Input
    entropy_bytes: AtomicU64,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                start_time: Instant::now(),
                instantiations: AtomicU64::new(0),
                reseeds: AtomicU64::new(0),
                interruptions: AtomicU64::new(0),
                generate_calls: AtomicU64::new(0),
                generate_failures: AtomicU64::new(0),
                bytes_generated: AtomicU64::new(0),
                entropy_bytes: AtomicU64::new(0),
            }),
        }
    }

    pub fn record_instantiate(&self, entropy_bytes: usize) {
        self.inner.instantiations.fetch_add(1, Ordering::Relaxed);
        self.inner.entropy_bytes.fetch_add(entropy_bytes as u64, Ordering::Relaxed);
    }

    pub fn record_reseed(&self, entropy_bytes: usize) {
        self.inner.reseeds.fetch_add(1, Ordering::Relaxed);
        self.inner.entropy_bytes.fetch_add(entropy_bytes as u64, Ordering::Relaxed);
    }

    pub fn record_interruption(&self) {
        self.inner.interruptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_generate(&self, bytes: usize) {
        self.inner.generate_calls.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_generated.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_generate_failure(&self) {
        self.inner.generate_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn instantiations(&self) -> u64 {
        self.inner.instantiations.load(Ordering::Relaxed)
    }

    pub fn reseeds(&self) -> u64 {
        self.inner.reseeds.load(Ordering::Relaxed)
    }

    pub fn interruptions(&self) -> u64 {
        self.inner.interruptions.load(Ordering::Relaxed)
    }

    pub fn generate_calls(&self) -> u64 {
        self.inner.generate_calls.load(Ordering::Relaxed)
    }

    pub fn generate_failures(&self) -> u64 {
        self.inner.generate_failures.load(Ordering::Relaxed)
    }

    pub fn bytes_generated(&self) -> u64 {
        self.inner.bytes_generated.load(Ordering::Relaxed)
    }

    pub fn entropy_bytes(&self) -> u64 {
        self.inner.entropy_bytes.load(Ordering::Relaxed)
    }

    // Derived metrics
    pub fn uptime_seconds(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn bytes_per_second(&self) -> f64 {
        let uptime = self.inner.start_time.elapsed().as_secs_f64();
        if uptime > 0.0 {
            self.bytes_generated() as f64 / uptime
        } else {
            0.0
        }
    }

    /// Generate Prometheus-compatible metrics output
    pub fn prometheus_format(&self) -> String {
        let counters = [
            ("hashdrbg_instantiations_total", "Engine instantiations", self.instantiations()),
            ("hashdrbg_reseeds_total", "Engine reseeds", self.reseeds()),
            ("hashdrbg_interruptions_total", "Entropy reads interrupted", self.interruptions()),
            ("hashdrbg_generate_calls_total", "Generate requests served", self.generate_calls()),
            ("hashdrbg_generate_failures_total", "Generate requests failed", self.generate_failures()),
            ("hashdrbg_bytes_generated_total", "Bytes of output generated", self.bytes_generated()),
            ("hashdrbg_entropy_bytes_total", "Bytes of entropy input consumed", self.entropy_bytes()),
        ];

        let mut output = String::new();
        for (name, help, value) in counters {
            output.push_str(&format!("# HELP {} {}\n", name, help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value));
        }

        output.push_str("# HELP hashdrbg_uptime_seconds Engine uptime in seconds\n");
        output.push_str("# TYPE hashdrbg_uptime_seconds gauge\n");
        output.push_str(&format!("hashdrbg_uptime_seconds {}\n", self.uptime_seconds()));

        output
    }
}
