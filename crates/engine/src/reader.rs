// Incremental reader feeding the frame decoder
//
// Window layout: [0, consumed) is spent, [consumed, filled) is waiting to be
// decoded, [filled, capacity) is free. Refilling first compacts the waiting
// bytes to the front.

use std::io::{ErrorKind, Read};
use tunestream_core::{AudioError, Result};

pub type TrackSource = Box<dyn Read + Send>;

pub struct StreamReader {
    buffer: Vec<u8>,
    consumed: usize,
    filled: usize,
    source: Option<TrackSource>,
    /// The source reported end of data (or failed)
    exhausted: bool,
}

impl StreamReader {
    /// Allocate the working buffer up front; the engine never grows it
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(capacity).map_err(|e| {
            AudioError::ResourceExhausted(format!(
                "read buffer of {} bytes: {}",
                capacity, e
            ))
        })?;
        buffer.resize(capacity, 0);

        Ok(Self {
            buffer,
            consumed: 0,
            filled: 0,
            source: None,
            exhausted: false,
        })
    }

    /// Start reading a new source. Any previous source is closed first.
    pub fn open(&mut self, source: TrackSource) {
        self.close();
        self.source = Some(source);
    }

    pub fn close(&mut self) {
        self.source = None;
        self.consumed = 0;
        self.filled = 0;
        self.exhausted = false;
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// True once the source has no more bytes to give
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes read but not yet consumed
    pub fn available(&self) -> usize {
        self.filled - self.consumed
    }

    pub fn unconsumed(&self) -> &[u8] {
        &self.buffer[self.consumed..self.filled]
    }

    /// Mark `n` bytes as used. Never moves past the filled length.
    pub fn consume(&mut self, n: usize) {
        let available = self.available();
        if n > available {
            log::error!(
                "[reader] overrun: consumed {} bytes with only {} available",
                n,
                available
            );
        }
        self.consumed += n.min(available);
    }

    /// Compact, then read as much as fits. Returns the unconsumed byte count,
    /// which is 0 only at end of stream.
    pub fn refill(&mut self) -> usize {
        if self.consumed > 0 {
            self.buffer.copy_within(self.consumed..self.filled, 0);
            self.filled -= self.consumed;
            self.consumed = 0;
        }

        if let Some(source) = self.source.as_mut() {
            while self.filled < self.buffer.len() && !self.exhausted {
                match source.read(&mut self.buffer[self.filled..]) {
                    Ok(0) => self.exhausted = true,
                    Ok(n) => self.filled += n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        log::error!("[reader] read failed, ending track: {}", e);
                        self.exhausted = true;
                    }
                }
            }
        }

        self.available()
    }
}
