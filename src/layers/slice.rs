//! Channel-axis slicing with ncnn's `-233` "equal division" sentinel:
//! a `-233` slice-size entry means "divide the remaining extent evenly
//! across the remaining output slots".

use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps};
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::{ElemType, Mat};

pub struct Slice {
    /// Raw slice-size entries as read from the topology, `-233`
    /// preserved verbatim until resolved against the actual channel
    /// count in `forward`.
    slices: Vec<i32>,
}

impl Default for Slice {
    fn default() -> Self {
        Self { slices: vec![] }
    }
}

impl Layer for Slice {
    fn caps(&self) -> LayerCaps {
        LayerCaps::default()
    }

    fn load_param(&mut self, pd: &ParamDict) -> Result<()> {
        self.slices = pd.get_int_array(0, &[]);
        Ok(())
    }

    fn forward(&self, bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        let bottom = bottoms.first().ok_or_else(|| NcnnError::ShapeMismatch { expected: vec![1], found: vec![0] })?;
        let sizes = resolve_slice_sizes(&self.slices, bottom.c)?;

        let mut outputs = Vec::with_capacity(sizes.len());
        let mut start = 0usize;
        for size in sizes {
            let mut out = Mat::create_3d(bottom.w, bottom.h, size, ElemType::F32, 1, None)?;
            for (dst_q, src_q) in (start..start + size).enumerate() {
                out.channel_f32_mut(dst_q).copy_from_slice(bottom.channel_f32(src_q));
            }
            start += size;
            outputs.push(out);
        }
        Ok(outputs)
    }
}

/// Resolves `-233` entries against `total_channels`: every `-233` slot
/// shares the remaining (unclaimed-by-explicit-sizes) extent evenly.
fn resolve_slice_sizes(slices: &[i32], total_channels: usize) -> Result<Vec<usize>> {
    if slices.is_empty() {
        return Err(NcnnError::MalformedTopology("Slice layer requires at least one slice size".into()));
    }

    let explicit_sum: i32 = slices.iter().filter(|&&s| s != -233).sum();
    let wildcard_count = slices.iter().filter(|&&s| s == -233).count();

    if explicit_sum as usize > total_channels {
        return Err(NcnnError::ShapeMismatch {
            expected: vec![total_channels],
            found: vec![explicit_sum as usize],
        });
    }

    let remaining = total_channels - explicit_sum as usize;
    if wildcard_count == 0 {
        if remaining != 0 {
            return Err(NcnnError::ShapeMismatch {
                expected: vec![total_channels],
                found: vec![explicit_sum as usize],
            });
        }
        return Ok(slices.iter().map(|&s| s as usize).collect());
    }

    if remaining % wildcard_count != 0 {
        return Err(NcnnError::MalformedTopology(format!(
            "cannot divide {remaining} channels evenly across {wildcard_count} wildcard slices"
        )));
    }
    let share = remaining / wildcard_count;

    Ok(slices
        .iter()
        .map(|&s| if s == -233 { share } else { s as usize })
        .collect())
}
