//! Per-channel additive bias: `bias_data_size = pd.get(0, 0)`, weights
//! loaded via `mb.load(bias_data_size, 1)`, applied as a per-channel add
//! in `forward_inplace`.

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

pub struct Bias {
    bias_data_size: usize,
    bias_data: Mat,
}

impl Default for Bias {
    fn default() -> Self {
        Self {
            bias_data_size: 0,
            bias_data: Mat::empty(),
        }
    }
}

impl Layer for Bias {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            support_inplace: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.bias_data_size = pd.get_int(0, 0).max(0) as usize;
        Ok(())
    }

    fn load_model(&mut self, mb: &mut dyn ModelBin) -> Result<()> {
        if self.bias_data_size == 0 {
            return Err(NcnnError::MalformedWeights("bias_data_size is 0".into()));
        }
        self.bias_data = mb.load(self.bias_data_size, 1)?;
        Ok(())
    }

    fn forward_inplace(&self, mats: &mut [Mat], opt: &RunOption) -> Result<()> {
        let bias_slice = self.bias_data.as_f32_slice();
        for mat in mats.iter_mut() {
            crate::parallel::for_each_channel_mut(mat, opt, |q, chunk| {
                let b = bias_slice[q % bias_slice.len()];
                for v in chunk {
                    *v += b;
                }
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model_bin::{RawModelBin};
    use std::io::Cursor;
    use byteorder::{LittleEndian, WriteBytesExt};

    #[test]
    fn bias_broadcasts_per_channel() {
        let mut layer = Bias::default();
        let dict = ParamDict::parse_tokens(&["0=2"]).unwrap();
        layer.load_param(&dict).unwrap();

        let mut buf = Vec::new();
        buf.write_f32::<LittleEndian>(10.0).unwrap();
        buf.write_f32::<LittleEndian>(20.0).unwrap();
        let mut mb = RawModelBin::new(Cursor::new(buf));
        layer.load_model(&mut mb).unwrap();

        let mut mat = Mat::create_3d(2, 1, 2, crate::tensor::ElemType::F32, 1, None).unwrap();
        mat.channel_f32_mut(0).copy_from_slice(&[1.0, 1.0]);
        mat.channel_f32_mut(1).copy_from_slice(&[2.0, 2.0]);

        layer.forward_inplace(std::slice::from_mut(&mut mat), &RunOption::default()).unwrap();
        assert_eq!(mat.channel_f32(0), &[11.0, 11.0]);
        assert_eq!(mat.channel_f32(1), &[22.0, 22.0]);
    }
}
