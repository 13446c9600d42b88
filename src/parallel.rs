//! Intra-layer parallel-for over channels. A bounded fork-join loop over
//! a `Mat`'s channel planes, which are contiguous `cstep`-sized and
//! therefore disjoint, so the channel dimension can be split into
//! independent mutable chunks without unsafe code.

use crate::option::RunOption;
use crate::tensor::Mat;

/// Runs `f(channel_index, channel_plane)` over every channel of `mat`,
/// in parallel when the `rayon` feature is enabled, else sequentially.
///
/// `opt.num_threads` is advisory: rayon's global pool is sized once for
/// the whole process on first use, so a per-call thread count can't be
/// honored exactly without paying per-call pool-spinup cost. This uses
/// rayon's global pool directly instead.
pub fn for_each_channel_mut<F>(mat: &mut Mat, opt: &RunOption, f: F)
where
    F: Fn(usize, &mut [f32]) + Sync,
{
    let plane_len = mat.cstep * mat.elempack.max(1);
    let _ = opt;
    let slice = mat.as_f32_slice_mut();

    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        slice.par_chunks_mut(plane_len.max(1)).enumerate().for_each(|(q, chunk)| f(q, chunk));
    }
    #[cfg(not(feature = "rayon"))]
    {
        for (q, chunk) in slice.chunks_mut(plane_len.max(1)).enumerate() {
            f(q, chunk);
        }
    }
}
