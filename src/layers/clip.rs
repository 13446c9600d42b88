//! `clip(min, max)`, clamping every element into `[min, max]`.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

pub struct Clip {
    min: f32,
    max: f32,
}

impl Default for Clip {
    fn default() -> Self {
        Self {
            min: f32::NEG_INFINITY,
            max: f32::INFINITY,
        }
    }
}

impl Layer for Clip {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            support_inplace: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.min = pd.get_float(0, f32::NEG_INFINITY);
        self.max = pd.get_float(1, f32::INFINITY);
        Ok(())
    }

    fn load_model(&mut self, _mb: &mut dyn ModelBin) -> Result<()> {
        Ok(())
    }

    fn forward_inplace(&self, mats: &mut [Mat], _opt: &RunOption) -> Result<()> {
        let min = self.min;
        let max = self.max;
        for mat in mats.iter_mut() {
            for v in mat.as_f32_slice_mut() {
                *v = v.clamp(min, max);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_clamps_to_range() {
        let mut layer = Clip::default();
        let dict = ParamDict::parse_tokens(&["0=0", "1=1"]).unwrap();
        layer.load_param(&dict).unwrap();
        let mut mat = Mat::from_f32_slice(&[3], &[-1.0, 0.5, 2.0]).unwrap();
        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        assert_eq!(mat.as_f32_slice(), &[0.0, 0.5, 1.0]);
    }
}
