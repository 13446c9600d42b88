//! Mish activation: `x * tanh(softplus(x))`.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::tensor::Mat;

#[derive(Default)]
pub struct Mish;

impl Layer for Mish {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            support_inplace: true,
            ..Default::default()
        }
    }

    fn forward_inplace(&self, mats: &mut [Mat], _opt: &RunOption) -> Result<()> {
        for mat in mats.iter_mut() {
            for v in mat.as_f32_slice_mut() {
                let softplus = (1.0 + v.exp()).ln();
                *v *= softplus.tanh();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mish_of_zero_is_zero() {
        let layer = Mish;
        let mut mat = Mat::from_f32_slice(&[1], &[0.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        assert!(mat.as_f32_slice()[0].abs() < 1e-6);
    }

    #[test]
    fn mish_matches_reference_value() {
        let layer = Mish;
        let mut mat = Mat::from_f32_slice(&[1], &[1.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        // mish(1) ~= 0.8650983883835725
        assert!((mat.as_f32_slice()[0] - 0.8650983883835725).abs() < 1e-5);
    }
}
