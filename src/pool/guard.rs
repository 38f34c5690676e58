//! RAII guard for pooled buffers
//!
//! Provides automatic return of buffers to the pool when dropped.

use super::BufferPool;
use std::ops::{Deref, DerefMut};

/// RAII guard that returns the buffer to its pool on drop
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: BufferPool,
}

impl PooledBuffer {
    pub(super) fn new(buf: Vec<u8>, pool: BufferPool) -> Self {
        PooledBuffer {
            buf: Some(buf),
            pool,
        }
    }

    /// Copy the first `n` bytes out so the buffer itself can go back
    pub fn to_vec(&self, n: usize) -> Vec<u8> {
        let n = n.min(self.len());
        self[..n].to_vec()
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf.as_deref_mut().unwrap_or(&mut [])
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}
