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

//! Bounded circular byte buffer shared by the jitter harvester and its readers
//!
//! One monitor (a `parking_lot::Mutex` plus two condition variables) guards the
//! slots. The producer blocks while the buffer is full, consumers block while
//! it is empty, and each side wakes the other on every state change. Slots are
//! zeroed as soon as they are consumed.

use crate::cancel::{CancellationToken, CANCEL_POLL_INTERVAL};
use crate::{Error, Result};
use parking_lot::{Condvar, Mutex};
use zeroize::Zeroize;

/// Thread-safe fixed-capacity byte ring
pub struct RingBuffer {
    inner: Mutex<RingInner>,
    not_empty: Condvar,
    not_full: Condvar,
}

struct RingInner {
    slots: Box<[u8]>,
    head: usize,
    len: usize,
    closed: bool,
    stats: RingStats,
}

#[derive(Debug, Clone, Default)]
pub struct RingStats {
    pub bytes_pushed: u64,
    pub bytes_popped: u64,
    pub producer_waits: u64,
    pub consumer_waits: u64,
}

/// Ring watermark levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatermarkLevel {
    Low,      // < 10%
    Medium,   // 10-80%
    High,     // 80-95%
    Critical, // > 95%
}

impl RingBuffer {
    /// Create a ring holding at most `capacity` bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(RingInner {
                slots: vec![0u8; capacity.max(1)].into_boxed_slice(),
                head: 0,
                len: 0,
                closed: false,
                stats: RingStats::default(),
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Append one byte, blocking while the ring is full
    ///
    /// Fails with `NotOpen` once the ring has been closed.
    pub fn push(&self, byte: u8) -> Result<()> {
        let mut inner = self.inner.lock();

        while inner.len == inner.slots.len() && !inner.closed {
            inner.stats.producer_waits += 1;
            self.not_full.wait(&mut inner);
        }

        if inner.closed {
            return Err(Error::NotOpen);
        }

        let tail = (inner.head + inner.len) % inner.slots.len();
        inner.slots[tail] = byte;
        inner.len += 1;
        inner.stats.bytes_pushed += 1;

        self.not_empty.notify_one();
        Ok(())
    }

    /// Fill `dest` one byte at a time, blocking while the ring is empty
    ///
    /// A read that cannot complete fails explicitly and wipes whatever it had
    /// already copied into `dest`: `NotOpen` if the ring was closed on entry,
    /// `AsynchronousClose` if it was closed while waiting, `ClosedByInterrupt`
    /// if `cancel` fired while waiting.
    pub fn pop_into(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.closed {
            return Err(Error::NotOpen);
        }

        for filled in 0..dest.len() {
            while inner.len == 0 {
                let failure = if inner.closed {
                    Some(Error::AsynchronousClose)
                } else if cancel.is_cancelled() {
                    Some(Error::ClosedByInterrupt)
                } else {
                    None
                };

                if let Some(err) = failure {
                    dest[..filled].zeroize();
                    return Err(err);
                }

                inner.stats.consumer_waits += 1;
                self.not_empty.wait_for(&mut inner, CANCEL_POLL_INTERVAL);
            }

            if inner.closed {
                dest[..filled].zeroize();
                return Err(Error::AsynchronousClose);
            }

            let head = inner.head;
            dest[filled] = inner.slots[head];
            inner.slots[head] = 0;
            inner.head = (head + 1) % inner.slots.len();
            inner.len -= 1;
            inner.stats.bytes_popped += 1;

            self.not_full.notify_one();
        }

        Ok(())
    }

    /// Close the ring and wake every blocked producer and consumer
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Zero every slot and drop buffered bytes
    pub fn wipe(&self) {
        let mut inner = self.inner.lock();
        inner.slots.zeroize();
        inner.head = 0;
        inner.len = 0;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().slots.len()
    }

    /// Get fill percentage (0.0 - 100.0)
    pub fn fill_percent(&self) -> f64 {
        let inner = self.inner.lock();
        (inner.len as f64 / inner.slots.len() as f64) * 100.0
    }

    /// Get current watermark level
    pub fn watermark(&self) -> WatermarkLevel {
        match self.fill_percent() {
            p if p < 10.0 => WatermarkLevel::Low,
            p if p < 80.0 => WatermarkLevel::Medium,
            p if p < 95.0 => WatermarkLevel::High,
            _ => WatermarkLevel::Critical,
        }
    }

    pub fn stats(&self) -> RingStats {
        self.inner.lock().stats.clone()
    }

    #[cfg(test)]
    pub(crate) fn raw_slots(&self) -> Vec<u8> {
        self.inner.lock().slots.to_vec()
    }
}

impl Drop for RingBuffer {
    fn drop(&mut self) {
        self.inner.get_mut().slots.zeroize();
    }
}
