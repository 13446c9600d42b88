//! Numerically-stable softmax along the channel axis. Only axis 0
//! (the channel axis of a rank-1 or rank-3 tensor) is implemented.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

pub struct Softmax {
    axis: i32,
}

impl Default for Softmax {
    fn default() -> Self {
        Self { axis: 0 }
    }
}

impl Layer for Softmax {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            support_inplace: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.axis = pd.get_int(0, 0);
        Ok(())
    }

    fn forward_inplace(&self, mats: &mut [Mat], _opt: &RunOption) -> Result<()> {
        for mat in mats.iter_mut() {
            let channels = mat.c.max(1);
            let plane = mat.w * mat.h * mat.d;

            if channels <= 1 {
                // `channel_f32_mut` is bounded to the logical extent, not
                // `cstep`, so trailing alignment padding never enters the
                // reduction.
                normalize(mat.channel_f32_mut(0));
                continue;
            }

            // Channel axis is the outer dimension in storage, but softmax
            // normalizes across channels independently at each spatial
            // position, so gather into a position-major buffer first.
            let mut values = vec![0.0f32; plane * channels];
            for q in 0..channels {
                let src = mat.channel_f32(q);
                for p in 0..plane {
                    values[p * channels + q] = src[p];
                }
            }
            for p in 0..plane {
                normalize(&mut values[p * channels..(p + 1) * channels]);
            }
            for q in 0..channels {
                let dst = mat.channel_f32_mut(q);
                for p in 0..plane {
                    dst[p] = values[p * channels + q];
                }
            }
        }
        Ok(())
    }
}

fn normalize(slice: &mut [f32]) {
    let max = slice.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut sum = 0.0f32;
    for v in slice.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in slice.iter_mut() {
        *v /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_sums_to_one() {
        let layer = Softmax::default();
        let mut mat = Mat::from_f32_slice(&[3], &[1.0, 2.0, 3.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        let sum: f32 = mat.as_f32_slice().iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn softmax_is_monotonic() {
        let layer = Softmax::default();
        let mut mat = Mat::from_f32_slice(&[3], &[1.0, 2.0, 3.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        let out = mat.as_f32_slice();
        assert!(out[0] < out[1] && out[1] < out[2]);
    }
}
