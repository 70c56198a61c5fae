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

//! Adapter turning any external byte stream into an entropy source
//!
//! File-backed and network-backed providers are opaque `std::io::Read`
//! implementations; this shim enforces the fill-completely contract on top of
//! them.

use super::EntropySource;
use crate::cancel::CancellationToken;
use crate::traits::Lifecycle;
use crate::{Error, Result};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;
use zeroize::Zeroize;

/// Default chunk pulled from the stream per underlying read
pub const DEFAULT_STREAM_CHUNK: usize = 256;

/// Entropy source over a blocking reader
pub struct StreamSource<R> {
    reader: Mutex<Option<R>>,
    open: AtomicBool,
    name: &'static str,
    chunk: usize,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(name: &'static str, reader: R) -> Self {
        Self::with_chunk(name, reader, DEFAULT_STREAM_CHUNK)
    }

    /// Use `chunk` as both the per-read size and the recommended buffer size
    pub fn with_chunk(name: &'static str, reader: R, chunk: usize) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            open: AtomicBool::new(true),
            name,
            chunk: chunk.max(1),
        }
    }

    fn fill_from(&self, reader: &mut R, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        let mut filled = 0;

        while filled < dest.len() {
            if cancel.is_cancelled() {
                return Err(Error::ClosedByInterrupt);
            }
            if !self.is_open() {
                return Err(Error::AsynchronousClose);
            }

            let end = (filled + self.chunk).min(dest.len());
            match reader.read(&mut dest[filled..end]) {
                Ok(0) => {
                    return Err(Error::Source(format!(
                        "{} ended after {} of {} bytes",
                        self.name,
                        filled,
                        dest.len()
                    )))
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }

        Ok(())
    }
}

impl<R: Read + Send> Lifecycle for StreamSource<R> {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Mark closed; the reader is dropped now if idle, otherwise by the
    /// blocked read when it notices
    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(mut guard) = self.reader.try_lock() {
            guard.take();
        }
    }
}

impl<R: Read + Send> EntropySource for StreamSource<R> {
    fn read(&self, dest: &mut [u8], cancel: &CancellationToken) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotOpen);
        }

        let mut guard = self.reader.lock();
        let reader = guard.as_mut().ok_or(Error::NotOpen)?;

        let result = self.fill_from(reader, dest, cancel);
        if let Err(err) = &result {
            dest.zeroize();
            if matches!(err, Error::ClosedByInterrupt | Error::AsynchronousClose) {
                debug!(source = self.name, "Stream read aborted: {}", err);
                self.open.store(false, Ordering::SeqCst);
                guard.take();
            }
        }
        result
    }

    fn recommended_buffer_size(&self) -> usize {
        self.chunk
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Reader returning at most `step` bytes per call
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_short_reads_are_accumulated() {
        let source = StreamSource::new(
            "trickle",
            Trickle {
                data: (0..40).collect(),
                pos: 0,
                step: 3,
            },
        );
        let mut out = [0u8; 20];
        source.read(&mut out, &CancellationToken::new()).unwrap();
        assert_eq!(out.to_vec(), (0..20).collect::<Vec<u8>>());
    }

    #[test]
    fn test_eof_is_an_error() {
        let source = StreamSource::new("file", Cursor::new(vec![1u8; 4]));
        let mut out = [0u8; 8];
        let err = source.read(&mut out, &CancellationToken::new()).unwrap_err();
        assert!(matches!(err, Error::Source(_)));
        assert_eq!(out, [0u8; 8]);
    }

    #[test]
    fn test_close() {
        let source = StreamSource::new("file", Cursor::new(vec![1u8; 64]));
        source.close();
        let mut out = [0u8; 8];
        assert!(matches!(
            source.read(&mut out, &CancellationToken::new()),
            Err(Error::NotOpen)
        ));
    }

    #[test]
    fn test_interrupt() {
        let source = StreamSource::new("file", Cursor::new(vec![1u8; 64]));
        let token = CancellationToken::new();
        token.cancel();
        let mut out = [0u8; 8];
        assert!(source.read(&mut out, &token).unwrap_err().is_interruption());
        assert!(!source.is_open());
    }
}
