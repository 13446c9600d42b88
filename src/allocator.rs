//! Pooled aligned-memory provider.
//!
//! Two roles share one implementation: a blob allocator for tensors that
//! live across layer boundaries, and a workspace allocator for scratch
//! that dies within one layer. Both are just `Arc<dyn Allocator>` handed
//! to `Mat::create`; callers decide which pool backs which role.

use std::alloc::{alloc, dealloc, Layout};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{NcnnError, Result};

/// Default alignment ncnn-style `Mat` storage is created with.
pub const DEFAULT_ALIGN: usize = 16;
/// Alignment preferred when the caller intends to feed wide SIMD lanes.
pub const SIMD_ALIGN: usize = 64;

/// An allocation handed out by an [`Allocator`]. Carries its own layout so
/// it can be freed without the allocator needing external bookkeeping.
pub struct AllocatedBlock {
    pub ptr: *mut u8,
    pub layout: Layout,
}

// SAFETY: the pointer is an owned heap allocation; it is only ever
// handed between the allocator and its single current owner (`Storage`).
unsafe impl Send for AllocatedBlock {}
unsafe impl Sync for AllocatedBlock {}

pub trait Allocator: Send + Sync {
    fn fast_malloc(&self, size: usize) -> Result<AllocatedBlock>;
    fn fast_free(&self, block: AllocatedBlock);
}

/// Pools recent allocations bucketed by size to avoid per-layer churn.
/// Internally synchronized with a `Mutex`, so it is safe to share across
/// extraction threads.
pub struct PooledAllocator {
    align: usize,
    /// bucketed free list: size -> stack of freed blocks of that size
    pool: Mutex<HashMap<usize, Vec<AllocatedBlock>>>,
    /// Best-effort cap on total bytes held in the pool; `None` = unbounded.
    local_pool_limit: Option<usize>,
    pooled_bytes: Mutex<usize>,
}

impl PooledAllocator {
    pub fn new(align: usize) -> Self {
        Self {
            align,
            pool: Mutex::new(HashMap::new()),
            local_pool_limit: None,
            pooled_bytes: Mutex::new(0),
        }
    }

    pub fn with_local_pool_limit(align: usize, limit_bytes: usize) -> Self {
        Self {
            align,
            pool: Mutex::new(HashMap::new()),
            local_pool_limit: Some(limit_bytes),
            pooled_bytes: Mutex::new(0),
        }
    }
}

impl Default for PooledAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ALIGN)
    }
}

impl Allocator for PooledAllocator {
    fn fast_malloc(&self, size: usize) -> Result<AllocatedBlock> {
        if size == 0 {
            return Err(NcnnError::AllocationFailed { size });
        }

        if let Some(block) = self
            .pool
            .lock()
            .unwrap()
            .get_mut(&size)
            .and_then(|bucket| bucket.pop())
        {
            *self.pooled_bytes.lock().unwrap() -= size;
            return Ok(block);
        }

        let layout = Layout::from_size_align(size, self.align)
            .map_err(|_| NcnnError::AllocationFailed { size })?;
        // SAFETY: layout has nonzero size (checked above).
        let ptr = unsafe { alloc(layout) };
        if ptr.is_null() {
            return Err(NcnnError::AllocationFailed { size });
        }
        Ok(AllocatedBlock { ptr, layout })
    }

    fn fast_free(&self, block: AllocatedBlock) {
        let size = block.layout.size();
        let within_budget = match self.local_pool_limit {
            Some(limit) => *self.pooled_bytes.lock().unwrap() + size <= limit,
            None => true,
        };

        if within_budget {
            *self.pooled_bytes.lock().unwrap() += size;
            self.pool.lock().unwrap().entry(size).or_default().push(block);
            return;
        }

        // SAFETY: `block` was produced by `fast_malloc` on this allocator
        // with this exact layout, and is not referenced elsewhere.
        unsafe { dealloc(block.ptr, block.layout) };
    }
}

impl Drop for PooledAllocator {
    fn drop(&mut self) {
        let mut pool = self.pool.lock().unwrap();
        for (_, bucket) in pool.drain() {
            for block in bucket {
                unsafe { dealloc(block.ptr, block.layout) };
            }
        }
    }
}

/// Process-wide default allocator, lazily and idempotently initialized;
/// teardown is best-effort at process exit via normal `Arc` drop.
/// Callers wanting determinism should inject allocators via `RunOption`
/// instead of relying on this.
pub fn default_allocator() -> std::sync::Arc<dyn Allocator> {
    use std::sync::OnceLock;
    static DEFAULT: OnceLock<std::sync::Arc<dyn Allocator>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| std::sync::Arc::new(PooledAllocator::default()))
        .clone()
}
