//! The graph's designated input layer type. Produces
//! nothing itself; `Extractor::input()` deposits the user-supplied
//! `Mat` directly into its top blob, so `forward` is never actually
//! invoked by the scheduler for this type — it exists purely so the
//! topology parser has a real `Layer` to construct for input nodes.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::tensor::Mat;

#[derive(Default)]
pub struct Input;

impl Layer for Input {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn forward(&self, _bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        Ok(vec![])
    }
}
