// PCM ring buffer between the decode worker and a real-time output callback

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fixed-capacity ring buffer of samples.
/// One slot is always kept free to tell "full" from "empty".
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    write_pos: usize,
    read_pos: usize,
    size: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    pub fn new(size: usize) -> Self {
        let size = size.max(2);
        Self {
            buffer: vec![T::default(); size],
            write_pos: 0,
            read_pos: 0,
            size,
        }
    }

    pub fn write(&mut self, data: &[T]) -> usize {
        let to_write = data.len().min(self.available_write());
        if to_write == 0 {
            return 0;
        }

        // Handle wrap-around in two chunks if necessary
        let write_end = self.write_pos + to_write;
        if write_end <= self.size {
            self.buffer[self.write_pos..write_end].copy_from_slice(&data[..to_write]);
            self.write_pos = write_end % self.size;
        } else {
            let first_chunk = self.size - self.write_pos;
            let second_chunk = to_write - first_chunk;

            self.buffer[self.write_pos..].copy_from_slice(&data[..first_chunk]);
            self.buffer[..second_chunk].copy_from_slice(&data[first_chunk..to_write]);
            self.write_pos = second_chunk;
        }

        to_write
    }

    pub fn read(&mut self, output: &mut [T]) -> usize {
        let to_read = output.len().min(self.available_read());
        if to_read == 0 {
            return 0;
        }

        let read_end = self.read_pos + to_read;
        if read_end <= self.size {
            output[..to_read].copy_from_slice(&self.buffer[self.read_pos..read_end]);
            self.read_pos = read_end % self.size;
        } else {
            let first_chunk = self.size - self.read_pos;
            let second_chunk = to_read - first_chunk;

            output[..first_chunk].copy_from_slice(&self.buffer[self.read_pos..]);
            output[first_chunk..to_read].copy_from_slice(&self.buffer[..second_chunk]);
            self.read_pos = second_chunk;
        }

        to_read
    }

    pub fn available_write(&self) -> usize {
        self.size - self.available_read() - 1
    }

    pub fn available_read(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.size - (self.read_pos - self.write_pos)
        }
    }

    pub fn clear(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
    }

    /// Usable capacity in samples
    pub fn capacity(&self) -> usize {
        self.size - 1
    }
}

struct Shared<T> {
    ring: Mutex<RingBuffer<T>>,
    space_available: Condvar,
}

/// Thread-safe ring buffer with a bounded blocking write.
/// The producer blocks while the buffer is full; the consumer never blocks.
pub struct SharedRingBuffer<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for SharedRingBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Copy + Default> SharedRingBuffer<T> {
    pub fn new(size: usize) -> Self {
        Self {
            inner: Arc::new(Shared {
                ring: Mutex::new(RingBuffer::new(size)),
                space_available: Condvar::new(),
            }),
        }
    }

    /// Write all of `data`, waiting for the consumer to make room.
    /// Returns the number of samples written, which is less than `data.len()`
    /// only when `timeout` elapsed first.
    pub fn write_timeout(&self, data: &[T], timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        let mut ring = self.inner.ring.lock();
        let mut written = 0;

        loop {
            written += ring.write(&data[written..]);
            if written == data.len() {
                return written;
            }
            if self
                .inner
                .space_available
                .wait_until(&mut ring, deadline)
                .timed_out()
            {
                written += ring.write(&data[written..]);
                return written;
            }
        }
    }

    pub fn read(&self, output: &mut [T]) -> usize {
        let read = self.inner.ring.lock().read(output);
        if read > 0 {
            self.inner.space_available.notify_all();
        }
        read
    }

    pub fn clear(&self) {
        self.inner.ring.lock().clear();
        self.inner.space_available.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_write_read_wraps_around() {
        let mut ring = RingBuffer::<i16>::new(8);
        assert_eq!(ring.capacity(), 7);

        assert_eq!(ring.write(&[1, 2, 3, 4, 5]), 5);
        let mut out = [0i16; 4];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(out, [1, 2, 3, 4]);

        // Crosses the end of the backing storage
        assert_eq!(ring.write(&[6, 7, 8, 9, 10]), 5);
        let mut out = [0i16; 6];
        assert_eq!(ring.read(&mut out), 6);
        assert_eq!(out, [5, 6, 7, 8, 9, 10]);
        assert_eq!(ring.available_read(), 0);
    }

    #[test]
    fn test_write_stops_when_full() {
        let mut ring = RingBuffer::<i16>::new(4);
        assert_eq!(ring.write(&[1, 2, 3, 4, 5]), 3);
        assert_eq!(ring.available_write(), 0);
        assert_eq!(ring.available_read(), ring.capacity());

        ring.clear();
        assert_eq!(ring.available_write(), 3);
    }

    #[test]
    fn test_write_timeout_gives_up() {
        let shared = SharedRingBuffer::<i16>::new(4);
        let started = Instant::now();
        let written = shared.write_timeout(&[1, 2, 3, 4, 5], Duration::from_millis(30));
        assert_eq!(written, 3);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_write_timeout_waits_for_reader() {
        let shared = SharedRingBuffer::<i16>::new(4);
        let reader = shared.clone();

        let consumer = thread::spawn(move || {
            let mut total = Vec::new();
            let mut out = [0i16; 2];
            while total.len() < 6 {
                let n = reader.read(&mut out);
                total.extend_from_slice(&out[..n]);
                thread::sleep(Duration::from_millis(2));
            }
            total
        });

        let written = shared.write_timeout(&[1, 2, 3, 4, 5, 6], Duration::from_secs(5));
        assert_eq!(written, 6);
        assert_eq!(consumer.join().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
