//! Binary weight reader. Two framings: tagged (a 32-bit tag word
//! precedes each tensor) and raw (caller already knows count and element
//! type from the topology). Byte order is little-endian throughout,
//! matching ncnn's on-disk format.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::{NcnnError, Result};
use crate::tensor::{elem, ElemType, Mat};

/// Tag values as used by ncnn's `.bin` weight format.
const TAG_RAW_F32: u32 = 0x0000_0000;
const TAG_QUANT_F16: u32 = 0x0130_6B47;
const TAG_QUANT_INT8: u32 = 0x000D_4B38;

pub trait ModelBin {
    /// Reads `count` elements, returning a rank-1 `Mat`. `elem_type_hint`
    /// is consulted only by `RawModelBin`, which has no tag word to read
    /// the type from; `TaggedModelBin` always trusts the tag it reads.
    fn load(&mut self, count: usize, elem_type_hint: u32) -> Result<Mat>;
}

/// Reads a 32-bit little-endian tag before each tensor's payload.
pub struct TaggedModelBin<R: Read> {
    reader: R,
}

impl<R: Read> TaggedModelBin<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> ModelBin for TaggedModelBin<R> {
    fn load(&mut self, count: usize, _elem_type_hint: u32) -> Result<Mat> {
        if count == 0 {
            return Ok(Mat::empty());
        }
        let tag = self
            .reader
            .read_u32::<LittleEndian>()
            .map_err(|e| NcnnError::MalformedWeights(format!("failed to read tag: {e}")))?;

        match tag {
            TAG_RAW_F32 => read_f32_mat(&mut self.reader, count),
            TAG_QUANT_F16 => read_f16_mat(&mut self.reader, count),
            TAG_QUANT_INT8 => read_int8_mat(&mut self.reader, count),
            other => Err(NcnnError::MalformedWeights(format!("unknown model-bin tag: 0x{other:08x}"))),
        }
    }
}

/// No tag word; caller already knows the element type (used for
/// float-only simple topologies).
pub struct RawModelBin<R: Read> {
    reader: R,
}

impl<R: Read> RawModelBin<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> ModelBin for RawModelBin<R> {
    fn load(&mut self, count: usize, elem_type_hint: u32) -> Result<Mat> {
        if count == 0 {
            return Ok(Mat::empty());
        }
        match ElemType::from_tag(elem_type_hint as i32) {
            Some(ElemType::F32) | None => read_f32_mat(&mut self.reader, count),
            Some(ElemType::F16) => read_f16_mat(&mut self.reader, count),
            Some(ElemType::I8) => read_int8_mat(&mut self.reader, count),
            Some(ElemType::Bf16) => read_bf16_mat(&mut self.reader, count),
            Some(ElemType::I32) => Err(NcnnError::MalformedWeights("i32 raw weights not supported".into())),
        }
    }
}

fn read_f32_mat(reader: &mut impl Read, count: usize) -> Result<Mat> {
    let mut out = Mat::zeros_f32(&[count])?;
    let slice = out.as_f32_slice_mut();
    for v in slice.iter_mut() {
        *v = reader
            .read_f32::<LittleEndian>()
            .map_err(|e| NcnnError::MalformedWeights(format!("truncated f32 weights: {e}")))?;
    }
    Ok(out)
}

fn read_f16_mat(reader: &mut impl Read, count: usize) -> Result<Mat> {
    let mut out = Mat::zeros_f32(&[count])?;
    let slice = out.as_f32_slice_mut();
    for v in slice.iter_mut() {
        let half = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| NcnnError::MalformedWeights(format!("truncated f16 weights: {e}")))?;
        *v = elem::f16_to_f32(half);
    }
    Ok(out)
}

fn read_bf16_mat(reader: &mut impl Read, count: usize) -> Result<Mat> {
    let mut out = Mat::zeros_f32(&[count])?;
    let slice = out.as_f32_slice_mut();
    for v in slice.iter_mut() {
        let half = reader
            .read_u16::<LittleEndian>()
            .map_err(|e| NcnnError::MalformedWeights(format!("truncated bf16 weights: {e}")))?;
        *v = elem::bf16_to_f32(half);
    }
    Ok(out)
}

fn read_int8_mat(reader: &mut impl Read, count: usize) -> Result<Mat> {
    // Per-tensor scale trails the quantized payload.
    let mut raw = vec![0i8; count];
    for byte in raw.iter_mut() {
        *byte = reader
            .read_i8()
            .map_err(|e| NcnnError::MalformedWeights(format!("truncated int8 weights: {e}")))?;
    }
    let scale = reader
        .read_f32::<LittleEndian>()
        .map_err(|e| NcnnError::MalformedWeights(format!("missing int8 scale: {e}")))?;

    let mut out = Mat::zeros_f32(&[count])?;
    let slice = out.as_f32_slice_mut();
    for (v, raw_i8) in slice.iter_mut().zip(raw.iter()) {
        *v = (*raw_i8 as f32) * scale;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use std::io::Cursor;

    #[test]
    fn tagged_raw_f32_round_trip() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(TAG_RAW_F32).unwrap();
        for v in [1.0f32, 2.0, 3.0] {
            buf.write_f32::<LittleEndian>(v).unwrap();
        }
        let mut bin = TaggedModelBin::new(Cursor::new(buf));
        let mat = bin.load(3, 0).unwrap();
        assert_eq!(mat.as_f32_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn tagged_f16_decodes() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(TAG_QUANT_F16).unwrap();
        buf.write_u16::<LittleEndian>(elem::f32_to_f16(1.5)).unwrap();
        let mut bin = TaggedModelBin::new(Cursor::new(buf));
        let mat = bin.load(1, 0).unwrap();
        assert!((mat.as_f32_slice()[0] - 1.5).abs() < 1e-3);
    }

    #[test]
    fn unknown_tag_is_error() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(0xdead_beef).unwrap();
        let mut bin = TaggedModelBin::new(Cursor::new(buf));
        assert!(bin.load(1, 0).is_err());
    }

    #[test]
    fn truncated_payload_is_error() {
        let mut buf = Vec::new();
        buf.write_u32::<LittleEndian>(TAG_RAW_F32).unwrap();
        buf.write_f32::<LittleEndian>(1.0).unwrap();
        let mut bin = TaggedModelBin::new(Cursor::new(buf));
        assert!(bin.load(3, 0).is_err());
    }

    #[test]
    fn raw_model_bin_uses_hint() {
        let mut buf = Vec::new();
        buf.write_f32::<LittleEndian>(4.0).unwrap();
        let mut bin = RawModelBin::new(Cursor::new(buf));
        let mat = bin.load(1, 1).unwrap();
        assert_eq!(mat.as_f32_slice(), &[4.0]);
    }

    #[test]
    fn zero_count_returns_empty_mat() {
        let mut bin = TaggedModelBin::new(Cursor::new(Vec::<u8>::new()));
        let mat = bin.load(0, 0).unwrap();
        assert!(mat.is_empty());
    }
}
