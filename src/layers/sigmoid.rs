//! Standard sigmoid activation.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::tensor::Mat;

#[derive(Default)]
pub struct Sigmoid;

impl Layer for Sigmoid {
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
                *v = 1.0 / (1.0 + (-*v).exp());
            }
        }
        Ok(())
    }
}
