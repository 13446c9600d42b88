//! Per-invocation inference options. Named `RunOption` rather than
//! `Option` to avoid shadowing `std::option::Option`. Defaults mirror
//! ncnn's own `Option` constructor.

use std::sync::Arc;

use crate::allocator::Allocator;

#[derive(Clone)]
pub struct RunOption {
    pub lightmode: bool,
    pub num_threads: usize,
    pub blob_allocator: Option<Arc<dyn Allocator>>,
    pub workspace_allocator: Option<Arc<dyn Allocator>>,

    pub openmp_blocktime: u32,

    pub use_winograd_convolution: bool,
    pub use_sgemm_convolution: bool,

    pub use_fp16_storage: bool,
    pub use_fp16_arithmetic: bool,
    pub use_fp16_packed: bool,
    pub use_bf16_storage: bool,

    pub use_int8_inference: bool,
    pub use_int8_storage: bool,
    pub use_int8_arithmetic: bool,

    pub use_packing_layout: bool,

    pub use_vulkan_compute: bool,
    pub use_shader_pack8: bool,
    pub use_cooperative_matrix: bool,
    pub use_subgroup_ops: bool,

    /// 0 = never, 1 = always, other = ncnn's hybrid mode; see
    /// `option.cpp`. Stored but inert in this CPU-only core.
    pub flush_denormals: u32,
}

impl Default for RunOption {
    fn default() -> Self {
        Self {
            lightmode: true,
            num_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            blob_allocator: None,
            workspace_allocator: None,

            openmp_blocktime: 20,

            use_winograd_convolution: true,
            use_sgemm_convolution: true,

            use_fp16_storage: true,
            use_fp16_arithmetic: true,
            use_fp16_packed: true,
            use_bf16_storage: false,

            use_int8_inference: true,
            use_int8_storage: true,
            use_int8_arithmetic: false,

            use_packing_layout: true,

            use_vulkan_compute: false,
            use_shader_pack8: false,
            use_cooperative_matrix: true,
            use_subgroup_ops: false,

            flush_denormals: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_option_cpp() {
        let opt = RunOption::default();
        assert!(opt.lightmode);
        assert!(opt.use_winograd_convolution);
        assert!(opt.use_sgemm_convolution);
        assert!(!opt.use_bf16_storage);
        assert!(opt.use_int8_inference);
        assert!(!opt.use_int8_arithmetic);
        assert!(!opt.use_vulkan_compute);
        assert_eq!(opt.openmp_blocktime, 20);
        assert_eq!(opt.flush_denormals, 3);
    }

    #[test]
    fn cloning_does_not_share_option_state() {
        let mut a = RunOption::default();
        a.lightmode = false;
        let b = a.clone();
        assert!(!b.lightmode);
    }
}
