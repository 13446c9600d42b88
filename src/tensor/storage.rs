//! Reference-counted backing store for a [`super::Mat`]. The payload is
//! an untyped aligned byte buffer rather than a fixed-type array, since
//! a `Mat` can hold f32/f16/bf16/i8/i32 elements at varying `elempack`.

use std::sync::Arc;

use crate::allocator::{AllocatedBlock, Allocator};

/// Owns one allocation and knows how to return it to its allocator.
/// Dropping the last `Arc<Storage>` releases the memory immediately.
pub struct Storage {
    block: Option<AllocatedBlock>,
    allocator: Arc<dyn Allocator>,
    len: usize,
}

impl Storage {
    pub fn new(len: usize, allocator: Arc<dyn Allocator>) -> crate::error::Result<Arc<Self>> {
        let block = allocator.fast_malloc(len)?;
        Ok(Arc::new(Self {
            block: Some(block),
            allocator,
            len,
        }))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.block.as_ref().expect("storage used after drop").ptr
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.block.as_ref().expect("storage used after drop").ptr
    }
}

impl Drop for Storage {
    fn drop(&mut self) {
        if let Some(block) = self.block.take() {
            self.allocator.fast_free(block);
        }
    }
}
