//! Reusable copy buffers shared by all streams.

use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Size of each pooled buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;

/// Default number of idle buffers retained.
pub const DEFAULT_MAX_IDLE: usize = 64;

#[derive(Debug)]
pub struct BufferPool {
    buffers: Mutex<Vec<Box<[u8]>>>,
    buffer_size: usize,
    max_idle: usize,
}

impl BufferPool {
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
            max_idle,
        }
    }

    /// Take a buffer; it goes back to the pool when the guard is dropped.
    pub fn checkout(&self) -> PooledBuffer<'_> {
        let buf = self
            .buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| vec![0u8; self.buffer_size].into_boxed_slice());

        PooledBuffer {
            buf: Some(buf),
            pool: self,
        }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn checkin(&self, buf: Box<[u8]>) {
        let mut buffers = self.buffers.lock().unwrap_or_else(PoisonError::into_inner);
        if buffers.len() < self.max_idle {
            buffers.push(buf);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE, DEFAULT_MAX_IDLE)
    }
}

pub struct PooledBuffer<'a> {
    buf: Option<Box<[u8]>>,
    pool: &'a BufferPool,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.checkin(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_is_returned_on_drop() {
        let pool = BufferPool::new(16, 4);
        assert_eq!(pool.idle(), 0);

        {
            let mut buf = pool.checkout();
            assert_eq!(buf.len(), 16);
            buf[0] = 7;
        }
        assert_eq!(pool.idle(), 1);

        // The same buffer is handed out again.
        let buf = pool.checkout();
        assert_eq!(buf[0], 7);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_idle_buffers_are_capped() {
        let pool = BufferPool::new(8, 2);
        let bufs: Vec<_> = (0..5).map(|_| pool.checkout()).collect();
        drop(bufs);
        assert_eq!(pool.idle(), 2);
    }
}
