//! Dense matmul + bias. Weight shape `[out, in]`, bias shape `[out]`,
//! matching the shape ncnn's innerproduct family expects.

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

pub struct InnerProduct {
    num_output: usize,
    bias_term: bool,
    in_features: usize,
    weight_data: Mat,
    bias_data: Mat,
}

impl Default for InnerProduct {
    fn default() -> Self {
        Self {
            num_output: 0,
            bias_term: false,
            in_features: 0,
            weight_data: Mat::empty(),
            bias_data: Mat::empty(),
        }
    }
}

impl Layer for InnerProduct {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.num_output = pd.get_int(0, 0).max(0) as usize;
        self.bias_term = pd.get_int(1, 0) != 0;
        self.in_features = pd.get_int(2, 0).max(0) as usize;
        Ok(())
    }

    fn load_model(&mut self, mb: &mut dyn ModelBin) -> Result<()> {
        self.weight_data = mb.load(self.num_output * self.in_features, 0)?;
        if self.bias_term {
            self.bias_data = mb.load(self.num_output, 1)?;
        }
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let num_output = self.num_output;
        let in_features = self.in_features;
        let bias_term = self.bias_term;
        let weight = &self.weight_data;
        let bias = &self.bias_data;

        if weight.is_empty() {
            return Err(NcnnError::MalformedWeights("inner product weights not loaded".into()));
        }
        let weight_slice = weight.as_f32_slice();

        let mut outputs = Vec::with_capacity(bottoms.len());
        for bottom in bottoms {
            // Flatten channel-major, logical extent only: `as_f32_slice`
            // would include each channel's `cstep` alignment padding,
            // which is not part of the feature vector.
            let channels = bottom.c.max(1);
            let plane = bottom.w * bottom.h * bottom.d;
            let mut input = Vec::with_capacity(plane * channels);
            for q in 0..channels {
                input.extend_from_slice(bottom.channel_f32(q));
            }
            if input.len() < in_features {
                return Err(NcnnError::ShapeMismatch {
                    expected: vec![in_features],
                    found: vec![input.len()],
                });
            }
            let mut out = Mat::zeros_f32(&[num_output])?;
            let out_slice = out.as_f32_slice_mut();
            for o in 0..num_output {
                let mut acc = if bias_term { bias.as_f32_slice()[o] } else { 0.0 };
                let row = &weight_slice[o * in_features..(o + 1) * in_features];
                for i in 0..in_features {
                    acc += row[i] * input[i];
                }
                out_slice[o] = acc;
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{LittleEndian, WriteBytesExt};
    use crate::model_bin::RawModelBin;
    use std::io::Cursor;

    #[test]
    fn matmul_plus_bias() {
        let mut layer = InnerProduct::default();
        let dict = ParamDict::parse_tokens(&["0=1", "1=1", "2=2"]).unwrap();
        layer.load_param(&dict).unwrap();

        let mut buf = Vec::new();
        buf.write_f32::<LittleEndian>(1.0).unwrap();
        buf.write_f32::<LittleEndian>(2.0).unwrap();
        buf.write_f32::<LittleEndian>(10.0).unwrap();
        let mut mb = RawModelBin::new(Cursor::new(buf));
        layer.load_model(&mut mb).unwrap();

        let input = Mat::from_f32_slice(&[2], &[3.0, 4.0]).unwrap();
        let out = layer.forward(&[input], &RunOption::default()).unwrap();
        assert_eq!(out[0].as_f32_slice(), &[3.0 * 1.0 + 4.0 * 2.0 + 10.0]);
    }
}
