//! Backend dispatch. Each concrete `Layer` owns its own numeric kernel
//! rather than delegating to a shared backend object, matching ncnn's
//! own design where each layer implements its math inline. What remains
//! here is a GPU command-buffer seam: a trait with separate
//! record/submit/wait, unimplemented beyond a no-op, since Vulkan/GPU
//! execution is out of scope for this crate.

use crate::error::Result;

pub trait CommandBuffer {
    fn record(&mut self, op_name: &str) -> Result<()>;
    fn submit(&mut self) -> Result<()>;
    fn wait(&mut self) -> Result<()>;
}

/// The only implementation this crate ships: records nothing, submits
/// nothing, returns immediately. Exists so the trait point is real and
/// testable without building actual GPU plumbing.
#[derive(Debug, Default)]
pub struct NullCommandBuffer;

impl CommandBuffer for NullCommandBuffer {
    fn record(&mut self, _op_name: &str) -> Result<()> {
        Ok(())
    }

    fn submit(&mut self) -> Result<()> {
        Ok(())
    }

    fn wait(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_command_buffer_is_a_no_op() {
        let mut cb = NullCommandBuffer;
        cb.record("conv").unwrap();
        cb.submit().unwrap();
        cb.wait().unwrap();
    }
}
