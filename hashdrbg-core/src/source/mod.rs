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

//! Entropy sources
//!
//! An [`EntropySource`] fills a buffer completely or fails; blocking is
//! expected. Concrete sources are selected through [`SourceKind`], whose
//! registry maps each kind to a constructor returning either a shareable
//! instance or an `Unsupported` error.

mod jitter;
mod os;
mod request;
mod ring;
mod stream;

#[cfg(any(test, feature = "test-utils"))]
mod fixed;

pub use jitter::{JitterConfig, SchedulerJitterSource};
pub use os::OsSource;
pub use request::{EntropyRequest, RequestLimits};
pub use ring::{RingBuffer, RingStats, WatermarkLevel};
pub use stream::{StreamSource, DEFAULT_STREAM_CHUNK};

#[cfg(any(test, feature = "test-utils"))]
pub use fixed::FixedSource;

use crate::cancel::CancellationToken;
use crate::config::DrbgConfig;
use crate::traits::Lifecycle;
use crate::{Error, Result};
use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use tracing::debug;
use zeroize::Zeroizing;

/// Provider of raw unpredictable bytes
pub trait EntropySource: Lifecycle + Send + Sync {
    /// Fill `dest` completely, blocking as long as needed
    ///
    /// Fails with `NotOpen` on a closed source, `ClosedByInterrupt` when
    /// `cancel` fires (the source is closed as a result) and
    /// `AsynchronousClose` when another thread closes the source mid-read.
    fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()>;

    /// Buffer size used when a caller does not specify one
    fn recommended_buffer_size(&self) -> usize;

    fn name(&self) -> &'static str;
}

/// Constructor registered for a [`SourceKind`]
pub type SourceConstructor = fn(&DrbgConfig) -> Result<Arc<dyn EntropySource>>;

/// Available entropy source variants
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Operating system random device
    Os,
    /// Thread-scheduling jitter harvester
    SchedulerJitter,
}

impl Default for SourceKind {
    fn default() -> Self {
        Self::Os
    }
}

static REGISTRY: [(SourceKind, SourceConstructor); 2] = [
    (SourceKind::Os, open_os),
    (SourceKind::SchedulerJitter, open_scheduler_jitter),
];

static SUPPORT: [OnceLock<bool>; 2] = [OnceLock::new(), OnceLock::new()];

fn open_os(_config: &DrbgConfig) -> Result<Arc<dyn EntropySource>> {
    Ok(Arc::new(OsSource::new()?))
}

fn open_scheduler_jitter(config: &DrbgConfig) -> Result<Arc<dyn EntropySource>> {
    Ok(Arc::new(SchedulerJitterSource::new(config.jitter())?))
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Os, SourceKind::SchedulerJitter];

    fn index(self) -> usize {
        match self {
            Self::Os => 0,
            Self::SchedulerJitter => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Os => "os",
            Self::SchedulerJitter => "scheduler-jitter",
        }
    }

    /// Registered constructor for this kind
    pub fn constructor(self) -> SourceConstructor {
        REGISTRY[self.index()].1
    }

    /// Construct a new source of this kind
    pub fn open(self, config: &DrbgConfig) -> Result<Arc<dyn EntropySource>> {
        (self.constructor())(config)
    }

    /// Whether this kind can be constructed on the current host
    ///
    /// Probes once with the default configuration by building an instance
    /// and closing it; any failure means "unsupported" and is not
    /// propagated. The answer is cached for the life of the process.
    pub fn is_supported(self) -> bool {
        *SUPPORT[self.index()].get_or_init(|| match self.open(&DrbgConfig::default()) {
            Ok(source) => {
                source.close();
                true
            }
            Err(e) => {
                debug!(source = self.name(), "Entropy source unsupported: {}", e);
                false
            }
        })
    }

    /// Kinds usable on this host
    pub fn supported() -> Vec<SourceKind> {
        Self::ALL.into_iter().filter(|k| k.is_supported()).collect()
    }
}

impl std::str::FromStr for SourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "os" => Ok(Self::Os),
            "scheduler-jitter" | "jitter" => Ok(Self::SchedulerJitter),
            other => Err(Error::Config(format!("unknown entropy source '{}'", other))),
        }
    }
}

const CHANNEL_OPEN: u8 = 0;
const CHANNEL_CLOSED: u8 = 1;

/// Byte-stream view of an entropy source
///
/// Each read transfers between zero and `remaining` bytes into the
/// destination, advances its cursor by exactly that many and returns the
/// count. Bytes past the filled region are left untouched.
pub struct SourceChannel {
    source: Arc<dyn EntropySource>,
    cancel: CancellationToken,
    state: AtomicU8,
}

impl SourceChannel {
    pub fn new(source: Arc<dyn EntropySource>) -> Self {
        Self::with_token(source, CancellationToken::new())
    }

    /// Channel whose reads are interrupted by `cancel`
    pub fn with_token(source: Arc<dyn EntropySource>, cancel: CancellationToken) -> Self {
        Self {
            source,
            cancel,
            state: AtomicU8::new(CHANNEL_OPEN),
        }
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Read up to `min(dst.remaining_mut(), recommended buffer size)` bytes
    pub fn read_buf<B: BufMut>(&self, dst: &mut B) -> Result<usize> {
        if !self.is_open() || !self.source.is_open() {
            return Err(Error::NotOpen);
        }

        let len = dst.remaining_mut().min(self.source.recommended_buffer_size());
        if len == 0 {
            return Ok(0);
        }

        let mut chunk = Zeroizing::new(vec![0u8; len]);
        match self.source.read(&mut chunk, &self.cancel) {
            Ok(()) => {
                dst.put_slice(&chunk);
                Ok(len)
            }
            Err(err @ (Error::ClosedByInterrupt | Error::AsynchronousClose)) => {
                self.state.store(CHANNEL_CLOSED, Ordering::SeqCst);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

impl Lifecycle for SourceChannel {
    fn is_open(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CHANNEL_OPEN
    }

    /// Close this channel only; the shared source stays open
    fn close(&self) {
        self.state.store(CHANNEL_CLOSED, Ordering::SeqCst);
    }
}

impl std::io::Read for SourceChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut cursor = buf;
        SourceChannel::read_buf(self, &mut cursor).map_err(Into::into)
    }
}
