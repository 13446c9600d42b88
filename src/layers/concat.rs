//! Channel-axis concatenation. Only the channel axis is implemented.

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::tensor::{ElemType, Mat};

#[derive(Default)]
pub struct Concat;

impl Layer for Concat {
    fn caps(&self) -> LayerCaps {
        LayerCaps::default()
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        if bottoms.is_empty() {
            return Err(NcnnError::ShapeMismatch { expected: vec![1], found: vec![0] });
        }
        let (w, h) = (bottoms[0].w, bottoms[0].h);
        for b in bottoms {
            if b.w != w || b.h != h {
                return Err(NcnnError::ShapeMismatch {
                    expected: vec![w, h],
                    found: vec![b.w, b.h],
                });
            }
        }
        let total_c: usize = bottoms.iter().map(|b| b.c).sum();
        let mut out = Mat::create_3d(w, h, total_c, ElemType::F32, 1, None)?;

        let mut dst_q = 0;
        for b in bottoms {
            for q in 0..b.c {
                out.channel_f32_mut(dst_q).copy_from_slice(b.channel_f32(q));
                dst_q += 1;
            }
        }
        Ok(vec![out])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concat_stacks_channels_in_order() {
        let layer = Concat;
        let a = Mat::from_f32_slice(&[1, 1], &[1.0]).unwrap().reshape(&[1, 1, 1]).unwrap();
        let b = Mat::from_f32_slice(&[1, 1], &[2.0]).unwrap().reshape(&[1, 1, 1]).unwrap();
        let out = layer.forward(&[a, b], &RunOption::default()).unwrap();
        assert_eq!(out[0].c, 2);
        assert_eq!(out[0].channel_f32(0), &[1.0]);
        assert_eq!(out[0].channel_f32(1), &[2.0]);
    }
}
