//! Engine-inserted fan-out duplicator so every blob has at most one
//! consumer. Also directly constructible from topology for explicit
//! fan-out authoring. Pure copy, no computation.

use crate::error::Result;
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

#[derive(Default)]
pub struct Split {
    num_outputs: usize,
}

impl Layer for Split {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.num_outputs = pd.get_int(0, 2).max(1) as usize;
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let source = &bottoms[0];
        Ok((0..self.num_outputs).map(|_| source.share()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_duplicates_references_not_data() {
        let mut layer = Split::default();
        let dict = ParamDict::parse_tokens(&["0=3"]).unwrap();
        layer.load_param(&dict).unwrap();
        let input = Mat::from_f32_slice(&[2], &[1.0, 2.0]).unwrap();
        let outputs = layer.forward(&[input], &RunOption::default()).unwrap();
        assert_eq!(outputs.len(), 3);
        for out in &outputs {
            assert!(out.storage_is_shared());
            assert_eq!(out.as_f32_slice(), &[1.0, 2.0]);
        }
    }
}
