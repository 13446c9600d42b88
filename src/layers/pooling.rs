//! Max/average 2D pooling. Max pooling inits the
//! accumulator to `-inf`; average pooling with `count_include_pad=false`
//! normalizes by the number of non-padding taps actually summed.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::{ElemType, Mat};

const POOL_MAX: i32 = 0;
const POOL_AVG: i32 = 1;

pub struct Pooling {
    pooling_type: i32,
    kernel_w: usize,
    kernel_h: usize,
    stride_w: usize,
    stride_h: usize,
    pad_left: usize,
    pad_top: usize,
    count_include_pad: bool,
}

impl Default for Pooling {
    fn default() -> Self {
        Self {
            pooling_type: POOL_MAX,
            kernel_w: 1,
            kernel_h: 1,
            stride_w: 1,
            stride_h: 1,
            pad_left: 0,
            pad_top: 0,
            count_include_pad: true,
        }
    }
}

impl Layer for Pooling {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.pooling_type = pd.get_int(0, POOL_MAX);
        let kernel = pd.get_int(1, 1).max(1) as usize;
        self.kernel_w = kernel;
        self.kernel_h = pd.get_int(11, kernel as i32).max(1) as usize;
        let stride = pd.get_int(2, 1).max(1) as usize;
        self.stride_w = stride;
        self.stride_h = pd.get_int(12, stride as i32).max(1) as usize;
        let pad = pd.get_int(3, 0).max(0) as usize;
        self.pad_left = pad;
        self.pad_top = pd.get_int(13, pad as i32).max(0) as usize;
        self.count_include_pad = pd.get_int(5, 0) == 0;
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let ptype = self.pooling_type;
        let kw = self.kernel_w;
        let kh = self.kernel_h;
        let sw = self.stride_w;
        let sh = self.stride_h;
        let pad_l = self.pad_left;
        let pad_t = self.pad_top;
        let count_include_pad = self.count_include_pad;

        let mut outputs = Vec::with_capacity(bottoms.len());
        for bottom in bottoms {
            let w = bottom.w;
            let h = bottom.h;
            let c = bottom.c;
            let out_w = (w + 2 * pad_l - kw) / sw + 1;
            let out_h = (h + 2 * pad_t - kh) / sh + 1;

            let mut out = Mat::create_3d(out_w, out_h, c, ElemType::F32, 1, None)?;
            for q in 0..c {
                let src = bottom.channel_f32(q);
                let dst = out.channel_f32_mut(q);
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let x0 = (ox * sw) as isize - pad_l as isize;
                        let y0 = (oy * sh) as isize - pad_t as isize;
                        let (mut acc, mut count) = match ptype {
                            POOL_MAX => (f32::NEG_INFINITY, 0usize),
                            _ => (0.0f32, 0usize),
                        };
                        for ky in 0..kh {
                            for kx in 0..kw {
                                let x = x0 + kx as isize;
                                let y = y0 + ky as isize;
                                let in_bounds = x >= 0 && y >= 0 && (x as usize) < w && (y as usize) < h;
                                match ptype {
                                    POOL_MAX => {
                                        if in_bounds {
                                            let v = src[y as usize * w + x as usize];
                                            acc = acc.max(v);
                                        }
                                    }
                                    _ => {
                                        if in_bounds {
                                            acc += src[y as usize * w + x as usize];
                                            count += 1;
                                        } else if count_include_pad {
                                            count += 1;
                                        }
                                    }
                                }
                            }
                        }
                        dst[oy * out_w + ox] = match ptype {
                            POOL_MAX => acc,
                            _ => acc / count.max(1) as f32,
                        };
                    }
                }
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_pool_2x2_stride_2() {
        let mut layer = Pooling::default();
        let dict = ParamDict::parse_tokens(&["0=0", "1=2", "2=2"]).unwrap();
        layer.load_param(&dict).unwrap();
        let input = Mat::from_f32_slice(&[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap().reshape(&[2, 2, 1]).unwrap();
        let out = layer.forward(&[input], &RunOption::default()).unwrap();
        assert_eq!(out[0].as_f32_slice()[0], 4.0);
    }

    #[test]
    fn average_pool_excludes_padding_when_configured() {
        let mut layer = Pooling::default();
        let dict = ParamDict::parse_tokens(&["0=1", "1=2", "2=2", "3=1", "5=1"]).unwrap();
        layer.load_param(&dict).unwrap();
        let input = Mat::from_f32_slice(&[2, 2], &[1.0, 2.0, 3.0, 4.0]).unwrap().reshape(&[2, 2, 1]).unwrap();
        let out = layer.forward(&[input], &RunOption::default()).unwrap();
        // top-left 2x2 window at (-1,-1) covers only the single value 1.0
        assert_eq!(out[0].as_f32_slice()[0], 1.0);
    }
}
