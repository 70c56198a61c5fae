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

//! Cooperative cancellation for blocking entropy reads

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often a blocked reader re-checks its token
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared flag that interrupts blocking reads
///
/// Clones share state: cancelling one clone cancels all of them. A reader that
/// observes cancellation fails with [`crate::Error::ClosedByInterrupt`] and
/// never reports partial success.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request interruption of every read observing this token
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with `ClosedByInterrupt` if cancellation was requested
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::ClosedByInterrupt)
        } else {
            Ok(())
        }
    }
}
