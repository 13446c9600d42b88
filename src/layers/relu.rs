//! Plain or leaky ReLU depending on a single slope parameter:
//! `slope = pd.get(0, 0.f)`, and `forward_inplace` branches on whether
//! `slope == 0.0` (plain ReLU) or not (leaky ReLU).

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

#[derive(Default)]
pub struct ReLU {
    slope: f32,
}

impl Layer for ReLU {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            support_inplace: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.slope = pd.get_float(0, 0.0);
        Ok(())
    }

    fn load_model(&mut self, _mb: &mut dyn ModelBin) -> Result<()> {
        Ok(())
    }

    fn forward_inplace(&self, mats: &mut [Mat], _opt: &RunOption) -> Result<()> {
        let slope = self.slope;
        for mat in mats.iter_mut() {
            if slope == 0.0 {
                for v in mat.as_f32_slice_mut() {
                    *v = v.max(0.0);
                }
            } else {
                for v in mat.as_f32_slice_mut() {
                    if *v < 0.0 {
                        *v *= slope;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_relu_zeroes_negatives() {
        let mut layer = ReLU::default();
        layer.load_param(&ParamDict::new()).unwrap();
        let mut mat = Mat::from_f32_slice(&[4], &[-2.0, -0.5, 0.0, 3.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        assert_eq!(mat.as_f32_slice(), &[0.0, 0.0, 0.0, 3.0]);
    }

    #[test]
    fn leaky_relu_scales_negatives() {
        let mut layer = ReLU::default();
        let dict = ParamDict::parse_tokens(&["0=0.1"]).unwrap();
        layer.load_param(&dict).unwrap();
        let mut mat = Mat::from_f32_slice(&[2], &[-10.0, 5.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        assert_eq!(mat.as_f32_slice(), &[-1.0, 5.0]);
    }
}
