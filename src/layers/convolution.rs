//! Direct (non-Winograd, non-sgemm) 2D convolution. `use_winograd_convolution`/
//! `use_sgemm_convolution` are recognized `RunOption` fields but this
//! core always takes the direct path (Non-goal: no algorithmic-variant
//! kernels beyond the uniform interface).

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::{ElemType, Mat};

pub struct Convolution {
    num_output: usize,
    kernel_w: usize,
    kernel_h: usize,
    stride_w: usize,
    stride_h: usize,
    pad_left: usize,
    pad_top: usize,
    bias_term: bool,
    weight_data: Mat,
    bias_data: Mat,
    in_channels: usize,
}

impl Default for Convolution {
    fn default() -> Self {
        Self {
            num_output: 0,
            kernel_w: 1,
            kernel_h: 1,
            stride_w: 1,
            stride_h: 1,
            pad_left: 0,
            pad_top: 0,
            bias_term: false,
            weight_data: Mat::empty(),
            bias_data: Mat::empty(),
            in_channels: 0,
        }
    }
}

impl Layer for Convolution {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.num_output = pd.get_int(0, 0).max(0) as usize;
        let kernel = pd.get_int(1, 1).max(1) as usize;
        self.kernel_w = kernel;
        self.kernel_h = pd.get_int(11, kernel as i32).max(1) as usize;
        let stride = pd.get_int(3, 1).max(1) as usize;
        self.stride_w = stride;
        self.stride_h = pd.get_int(13, stride as i32).max(1) as usize;
        let pad = pd.get_int(4, 0).max(0) as usize;
        self.pad_left = pad;
        self.pad_top = pd.get_int(14, pad as i32).max(0) as usize;
        self.bias_term = pd.get_int(5, 0) != 0;
        self.in_channels = pd.get_int(6, 0).max(0) as usize;
        Ok(())
    }

    fn load_model(&mut self, mb: &mut dyn ModelBin) -> Result<()> {
        let weight_count = self.num_output * self.in_channels * self.kernel_w * self.kernel_h;
        self.weight_data = mb.load(weight_count, 0)?;

        if self.bias_term {
            self.bias_data = mb.load(self.num_output, 1)?;
        }
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let num_output = self.num_output;
        let kw = self.kernel_w;
        let kh = self.kernel_h;
        let sw = self.stride_w;
        let sh = self.stride_h;
        let pad_l = self.pad_left;
        let pad_t = self.pad_top;
        let bias_term = self.bias_term;
        let weight = &self.weight_data;
        let bias = &self.bias_data;

        if weight.is_empty() {
            return Err(NcnnError::MalformedWeights("convolution weights not loaded".into()));
        }

        let mut outputs = Vec::with_capacity(bottoms.len());
        for bottom in bottoms {
            let w = bottom.w;
            let h = bottom.h;
            let in_ch = bottom.c;
            let out_w = (w + 2 * pad_l - kw) / sw + 1;
            let out_h = (h + 2 * pad_t - kh) / sh + 1;
            let weight_slice = weight.as_f32_slice();

            let mut out = Mat::create_3d(out_w, out_h, num_output, ElemType::F32, 1, None)?;
            for oc in 0..num_output {
                let bias_v = if bias_term { bias.as_f32_slice()[oc] } else { 0.0 };
                let dst = out.channel_f32_mut(oc);
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut acc = bias_v;
                        for ic in 0..in_ch {
                            let src = bottom.channel_f32(ic);
                            let weight_base = ((oc * in_ch + ic) * kh) * kw;
                            for ky in 0..kh {
                                for kx in 0..kw {
                                    let x = ox * sw + kx;
                                    let y = oy * sh + ky;
                                    if x < pad_l || y < pad_t {
                                        continue;
                                    }
                                    let x = x - pad_l;
                                    let y = y - pad_t;
                                    if x >= w || y >= h {
                                        continue;
                                    }
                                    acc += src[y * w + x] * weight_slice[weight_base + ky * kw + kx];
                                }
                            }
                        }
                        dst[oy * out_w + ox] = acc;
                    }
                }
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}
