//! Buffer pool module for etgate
//!
//! Request reads draw their buffer from a pool keyed by a fixed size class.
//! Buffers are handed out wrapped in a [`PooledBuffer`] guard which puts them
//! back on every exit path.

mod guard;

pub use guard::PooledBuffer;

use std::sync::{Arc, Mutex};

/// Default size class for request buffers
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of idle buffers kept around
pub const DEFAULT_MAX_IDLE: usize = 64;

/// A pool of equally sized byte buffers
#[derive(Debug, Clone)]
pub struct BufferPool {
    size: usize,
    max_idle: usize,
    idle: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Create a pool whose buffers are `size` bytes long
    pub fn new(size: usize) -> Self {
        Self::with_max_idle(size, DEFAULT_MAX_IDLE)
    }

    /// Create a pool keeping at most `max_idle` released buffers
    pub fn with_max_idle(size: usize, max_idle: usize) -> Self {
        BufferPool {
            size,
            max_idle,
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Size class of this pool
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of buffers currently waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    /// Take a buffer out of the pool, allocating if none is idle
    pub fn acquire(&self) -> PooledBuffer {
        let buf = self
            .idle
            .lock()
            .ok()
            .and_then(|mut idle| idle.pop())
            .unwrap_or_else(|| vec![0u8; self.size]);
        PooledBuffer::new(buf, self.clone())
    }

    pub(crate) fn release(&self, mut buf: Vec<u8>) {
        if buf.len() != self.size {
            buf.resize(self.size, 0);
        }
        // A poisoned lock only means another holder panicked; drop the buffer.
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(buf);
            }
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}
