//! Converts between element types via `type_from`/`type_to` params
//! (1=f32, 2=f16, 3=int8, 4=bf16). Element storage in this crate
//! is always logically f32 internally (see `tensor::elem`), so `Cast`
//! here round-trips values through the target type's precision rather
//! than changing `Mat::elem_type` bit layout, matching the numeric
//! behavior of `float32_to_int8`/`float32_to_float16`/etc. without a
//! packed on-disk representation change.

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::{elem, ElemType, Mat};

pub struct Cast {
    type_from: i32,
    type_to: i32,
}

impl Default for Cast {
    fn default() -> Self {
        Self {
            type_from: 1,
            type_to: 1,
        }
    }
}

impl Layer for Cast {
    fn caps(&self) -> LayerCaps {
        LayerCaps {
            one_blob_only: true,
            ..Default::default()
        }
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.type_from = pd.get_int(0, 1);
        self.type_to = pd.get_int(1, 1);
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let target = ElemType::from_tag(self.type_to)
            .ok_or_else(|| NcnnError::MalformedTopology(format!("unknown cast target type tag {type_to}")))?;

        let mut outputs = Vec::with_capacity(bottoms.len());
        for bottom in bottoms {
            let mut out = bottom.deep_clone()?;
            for v in out.as_f32_slice_mut() {
                *v = round_trip(*v, target);
            }
            outputs.push(out);
        }
        Ok(outputs)
    }
}

fn round_trip(value: f32, target: ElemType) -> f32 {
    match target {
        ElemType::F32 => value,
        ElemType::F16 => elem::f16_to_f32(elem::f32_to_f16(value)),
        ElemType::Bf16 => elem::bf16_to_f32(elem::f32_to_bf16(value)),
        ElemType::I8 => (value.round().clamp(-128.0, 127.0)) as i8 as f32,
        ElemType::I32 => value.round(),
    }
}
