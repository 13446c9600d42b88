//! Packing-layout conversion: reshuffles lanes between `elempack` 1, 4
//! and 8 so that `convert_packing(convert_packing(t, k), 1)` reproduces
//! the original tensor bit-for-bit.
//!
//! ncnn normally does this with SIMD shuffles per-platform; this is the
//! scalar reference form, with no SIMD kernels of its own.

use super::{ElemType, Mat};
use crate::error::Result;

/// Re-packs `src` so that `elempack` becomes `out_pack` (one of 1, 4, 8).
/// `src` must currently be `F32` with rank 3 ([w, h, c * elempack]).
pub fn convert_packing(src: &Mat, out_pack: usize) -> Result<Mat> {
    assert!(matches!(out_pack, 1 | 4 | 8), "elempack must be 1, 4 or 8");
    assert_eq!(src.elem_type, ElemType::F32, "packing conversion only implemented for f32");

    if src.elempack == out_pack {
        return src.deep_clone();
    }

    let in_pack = src.elempack.max(1);
    let total_channels = src.c * in_pack;
    assert_eq!(total_channels % out_pack, 0, "channel count must be divisible by the target elempack");

    let out_c = total_channels / out_pack;
    let mut out = Mat::create_3d(src.w, src.h, out_c, ElemType::F32, out_pack, None)?;

    let plane = src.w * src.h;
    for elem in 0..total_channels {
        let src_q = elem / in_pack;
        let src_lane = elem % in_pack;
        let dst_q = elem / out_pack;
        let dst_lane = elem % out_pack;

        let src_channel = src.channel_f32(src_q);
        let dst_channel = out.channel_f32_mut(dst_q);
        for p in 0..plane {
            dst_channel[p * out_pack + dst_lane] = src_channel[p * in_pack + src_lane];
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequential_mat(w: usize, h: usize, c: usize) -> Mat {
        let mut m = Mat::create_3d(w, h, c, ElemType::F32, 1, None).unwrap();
        let mut v = 0.0f32;
        for q in 0..c {
            for x in m.channel_f32_mut(q) {
                *x = v;
                v += 1.0;
            }
        }
        m
    }

    #[test]
    fn packing_round_trip_is_identity() {
        let original = sequential_mat(3, 3, 8);
        let packed = convert_packing(&original, 4).unwrap();
        assert_eq!(packed.elempack, 4);
        let back = convert_packing(&packed, 1).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn pack_8_round_trip() {
        let original = sequential_mat(2, 2, 16);
        let packed = convert_packing(&original, 8).unwrap();
        let back = convert_packing(&packed, 1).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn same_pack_is_deep_clone() {
        let original = sequential_mat(2, 2, 4);
        let same = convert_packing(&original, 1).unwrap();
        assert_eq!(same, original);
        assert!(!same.storage_is_shared());
    }
}
