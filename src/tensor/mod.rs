pub mod elem;
pub mod ops;
pub mod storage;

use std::sync::Arc;

use crate::allocator::{default_allocator, Allocator};
use crate::error::{NcnnError, Result};
pub use elem::ElemType;
pub use storage::Storage;

/// Rounds `v` up to the next multiple of `align` (in elements).
fn align_up(v: usize, align: usize) -> usize {
    if align <= 1 {
        return v;
    }
    (v + align - 1) / align * align
}

/// N-dimensional dense tensor, rank 1..=4.
///
/// `cstep` is the channel stride in elements: moving from `channel(q)` to
/// `channel(q + 1)` advances the data pointer by `cstep * elemsize` bytes.
/// It is aligned so that each channel plane starts on a 16-byte boundary,
/// independent of `w * h * d`.
///
/// `byte_offset` lets `channel_view`/`row_view` share a parent's `Storage`
/// without owning a separate allocation.
///
/// `Mat`'s `Clone` impl is a deep copy that forces a fresh allocation
/// rather than bumping the `Arc` — deliberately different from ncnn's
/// C++ `Mat` copy constructor, which only bumps a refcount. Code that
/// wants cheap storage-sharing (views, `Split`) must call [`Mat::share`]
/// explicitly instead of `.clone()`.
pub struct Mat {
    pub w: usize,
    pub h: usize,
    pub d: usize,
    pub c: usize,
    pub dims: u8,
    pub elemsize: usize,
    pub elempack: usize,
    pub elem_type: ElemType,
    pub cstep: usize,
    byte_offset: usize,
    storage: Option<Arc<Storage>>,
}

impl Mat {
    /// An empty tensor: null storage, zero dims.
    pub fn empty() -> Self {
        Self {
            w: 0,
            h: 0,
            d: 0,
            c: 0,
            dims: 0,
            elemsize: 4,
            elempack: 1,
            elem_type: ElemType::F32,
            cstep: 0,
            byte_offset: 0,
            storage: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
    }

    /// Aligns the per-channel plane so that `channel(q+1)` starts on a
    /// 16-byte boundary, regardless of `elemsize`. Fixed at 16 bytes here
    /// rather than ncnn's per-platform choice — see DESIGN.md Open
    /// Question.
    fn compute_cstep(w: usize, h: usize, d: usize, elemsize: usize) -> usize {
        let raw = w * h * d;
        if elemsize == 0 {
            return raw;
        }
        let elems_per_16b = (16 / elemsize).max(1);
        align_up(raw, elems_per_16b)
    }

    #[allow(clippy::too_many_arguments)]
    fn with_allocator(
        dims: u8,
        w: usize,
        h: usize,
        d: usize,
        c: usize,
        elemsize: usize,
        elempack: usize,
        elem_type: ElemType,
        allocator: Option<Arc<dyn Allocator>>,
    ) -> Result<Self> {
        let cstep = Self::compute_cstep(w, h, d, elemsize);
        let total_elems = cstep * c.max(1);
        let total_bytes = total_elems * elemsize;
        let allocator = allocator.unwrap_or_else(default_allocator);
        let storage = Storage::new(total_bytes, allocator)?;
        Ok(Self {
            w,
            h,
            d,
            c,
            dims,
            elemsize,
            elempack,
            elem_type,
            cstep,
            byte_offset: 0,
            storage: Some(storage),
        })
    }

    pub fn create_1d(w: usize, elem_type: ElemType, elempack: usize, allocator: Option<Arc<dyn Allocator>>) -> Result<Self> {
        Self::with_allocator(1, w, 1, 1, 1, elem_type.byte_size() * elempack, elempack, elem_type, allocator)
    }

    pub fn create_2d(w: usize, h: usize, elem_type: ElemType, elempack: usize, allocator: Option<Arc<dyn Allocator>>) -> Result<Self> {
        Self::with_allocator(2, w, h, 1, 1, elem_type.byte_size() * elempack, elempack, elem_type, allocator)
    }

    pub fn create_3d(w: usize, h: usize, c: usize, elem_type: ElemType, elempack: usize, allocator: Option<Arc<dyn Allocator>>) -> Result<Self> {
        Self::with_allocator(3, w, h, 1, c, elem_type.byte_size() * elempack, elempack, elem_type, allocator)
    }

    pub fn create_4d(w: usize, h: usize, d: usize, c: usize, elem_type: ElemType, elempack: usize, allocator: Option<Arc<dyn Allocator>>) -> Result<Self> {
        Self::with_allocator(4, w, h, d, c, elem_type.byte_size() * elempack, elempack, elem_type, allocator)
    }

    /// Convenience: dense f32, elempack 1, default allocator.
    pub fn zeros_f32(dims: &[usize]) -> Result<Self> {
        let mut m = match dims.len() {
            1 => Self::create_1d(dims[0], ElemType::F32, 1, None)?,
            2 => Self::create_2d(dims[0], dims[1], ElemType::F32, 1, None)?,
            3 => Self::create_3d(dims[0], dims[1], dims[2], ElemType::F32, 1, None)?,
            4 => Self::create_4d(dims[0], dims[1], dims[2], dims[3], ElemType::F32, 1, None)?,
            n => return Err(NcnnError::ShapeMismatch { expected: vec![1, 2, 3, 4], found: vec![n] }),
        };
        m.fill(0.0);
        Ok(m)
    }

    pub fn from_f32_slice(dims: &[usize], data: &[f32]) -> Result<Self> {
        let mut m = Self::zeros_f32(dims)?;
        {
            let slice = m.as_f32_slice_mut();
            slice[..data.len()].copy_from_slice(data);
        }
        Ok(m)
    }

    /// Total logical element count (product of dims, *not* including
    /// cstep padding).
    pub fn total(&self) -> usize {
        match self.dims {
            0 => 0,
            1 => self.w,
            2 => self.w * self.h,
            3 => self.w * self.h * self.c,
            4 => self.w * self.h * self.d * self.c,
            _ => unreachable!("dims out of range"),
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self.dims {
            0 => vec![],
            1 => vec![self.w],
            2 => vec![self.w, self.h],
            3 => vec![self.w, self.h, self.c],
            4 => vec![self.w, self.h, self.d, self.c],
            _ => unreachable!(),
        }
    }

    /// Raw byte pointer to the start of channel `q`'s plane.
    ///
    /// # Safety contract
    /// Bounds checking is the caller's responsibility, matching ncnn's
    /// `Mat::channel()`: element access is by typed pointer, and bounds
    /// checks are on the caller.
    pub fn channel_ptr(&self, q: usize) -> *mut u8 {
        let base = self.storage.as_ref().expect("empty Mat has no storage").as_mut_ptr();
        unsafe { base.add(self.byte_offset + q * self.cstep * self.elemsize) }
    }

    pub fn as_f32_slice(&self) -> &[f32] {
        assert_eq!(self.elem_type, ElemType::F32, "Mat does not hold f32 elements");
        let ptr = self.channel_ptr(0) as *const f32;
        unsafe { std::slice::from_raw_parts(ptr, self.cstep * self.c.max(1) * self.elempack.max(1)) }
    }

    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        assert_eq!(self.elem_type, ElemType::F32, "Mat does not hold f32 elements");
        let ptr = self.channel_ptr(0) as *mut f32;
        unsafe { std::slice::from_raw_parts_mut(ptr, self.cstep * self.c.max(1) * self.elempack.max(1)) }
    }

    /// `elemsize` bundles `elempack` floats per packed lane group, so a
    /// plane holds `w * h * d * elempack` scalars, not `w * h * d`.
    pub fn channel_f32(&self, q: usize) -> &[f32] {
        assert_eq!(self.elem_type, ElemType::F32);
        let ptr = self.channel_ptr(q) as *const f32;
        unsafe { std::slice::from_raw_parts(ptr, self.w * self.h * self.d * self.elempack.max(1)) }
    }

    pub fn channel_f32_mut(&mut self, q: usize) -> &mut [f32] {
        assert_eq!(self.elem_type, ElemType::F32);
        let ptr = self.channel_ptr(q) as *mut f32;
        unsafe { std::slice::from_raw_parts_mut(ptr, self.w * self.h * self.d * self.elempack.max(1)) }
    }

    pub fn fill(&mut self, value: f32) {
        if self.is_empty() {
            return;
        }
        for v in self.as_f32_slice_mut() {
            *v = value;
        }
    }

    /// Rank-reducing slice along the outermost axis: `channel(q)` of a
    /// rank-3/4 tensor shares storage with the parent.
    pub fn channel_view(&self, q: usize) -> Mat {
        assert!(self.dims >= 3, "channel_view requires rank >= 3");
        let plane_cstep = self.w * self.h * self.d;
        Mat {
            w: self.w,
            h: self.h,
            d: self.d,
            c: 1,
            dims: self.dims - 1,
            elemsize: self.elemsize,
            elempack: self.elempack,
            elem_type: self.elem_type,
            cstep: plane_cstep,
            byte_offset: self.byte_offset + q * self.cstep * self.elemsize,
            storage: self.storage.clone(),
        }
    }

    /// Rank-2 row view sharing storage.
    pub fn row_view(&self, y: usize) -> Mat {
        assert_eq!(self.dims, 2, "row_view requires rank 2");
        Mat {
            w: self.w,
            h: 1,
            d: 1,
            c: 1,
            dims: 1,
            elemsize: self.elemsize,
            elempack: self.elempack,
            elem_type: self.elem_type,
            cstep: self.w,
            byte_offset: self.byte_offset + y * self.w * self.elemsize,
            storage: self.storage.clone(),
        }
    }

    /// Deep copy: always allocates fresh storage, even if this `Mat` is a
    /// shared view. This is what the `Clone` impl below calls; exposed
    /// separately because `Clone` cannot report an allocation failure.
    pub fn deep_clone(&self) -> Result<Mat> {
        if self.is_empty() {
            return Ok(Mat::empty());
        }
        let mut out = Self::with_allocator(
            self.dims,
            self.w,
            self.h,
            self.d,
            self.c,
            self.elemsize,
            self.elempack,
            self.elem_type,
            None,
        )?;
        out.as_bytes_mut().copy_from_slice(self.as_bytes());
        Ok(out)
    }

    /// Cheap alias: clones the `Arc<Storage>` handle rather than the
    /// bytes it points to. Backs `channel_view`/`row_view` and the
    /// `Split` layer's fan-out — anything that needs a true copy must
    /// use `Clone`/`deep_clone` instead.
    pub fn share(&self) -> Mat {
        Mat {
            w: self.w,
            h: self.h,
            d: self.d,
            c: self.c,
            dims: self.dims,
            elemsize: self.elemsize,
            elempack: self.elempack,
            elem_type: self.elem_type,
            cstep: self.cstep,
            byte_offset: self.byte_offset,
            storage: self.storage.clone(),
        }
    }

    /// Whether this `Mat`'s storage is shared with anything else (another
    /// view, or a second user handle). Used by the scheduler to decide
    /// whether in-place execution needs a defensive copy first.
    pub fn storage_is_shared(&self) -> bool {
        match &self.storage {
            Some(s) => Arc::strong_count(s) > 1,
            None => false,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        let ptr = self.channel_ptr(0) as *const u8;
        unsafe { std::slice::from_raw_parts(ptr, self.cstep * self.c.max(1) * self.elemsize) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let ptr = self.channel_ptr(0);
        unsafe { std::slice::from_raw_parts_mut(ptr, self.cstep * self.c.max(1) * self.elemsize) }
    }

    /// `reshape`: changes logical shape, preserves storage. Element
    /// count must match.
    pub fn reshape(&self, dims: &[usize]) -> Result<Mat> {
        let new_total: usize = dims.iter().product();
        if new_total != self.total() {
            return Err(NcnnError::ShapeMismatch { expected: dims.to_vec(), found: self.shape() });
        }
        let mut out = self.share();
        out.dims = dims.len() as u8;
        match dims.len() {
            1 => {
                out.w = dims[0];
                out.h = 1;
                out.d = 1;
                out.c = 1;
            }
            2 => {
                out.w = dims[0];
                out.h = dims[1];
                out.d = 1;
                out.c = 1;
            }
            3 => {
                out.w = dims[0];
                out.h = dims[1];
                out.d = 1;
                out.c = dims[2];
            }
            4 => {
                out.w = dims[0];
                out.h = dims[1];
                out.d = dims[2];
                out.c = dims[3];
            }
            n => return Err(NcnnError::ShapeMismatch { expected: dims.to_vec(), found: vec![n] }),
        }
        out.cstep = Self::compute_cstep(out.w, out.h, out.d, out.elemsize);
        Ok(out)
    }

    /// Subtract per-channel means and optionally scale, matching ncnn's
    /// `substract_mean_normalize(mean_vals, norm_vals)` preprocessing step.
    pub fn substract_mean_normalize(&mut self, means: &[f32], norms: Option<&[f32]>) {
        assert_eq!(self.dims, 3, "substract_mean_normalize expects a [w,h,c] image tensor");
        let channels = self.c;
        for q in 0..channels {
            let mean = means[q];
            let norm = norms.map(|n| n[q]).unwrap_or(1.0);
            for v in self.channel_f32_mut(q) {
                *v = (*v - mean) * norm;
            }
        }
    }
}

impl Clone for Mat {
    /// Deep copy. Allocation failure aborts the clone via `expect`,
    /// consistent with the rest of the standard library treating
    /// `Clone` as infallible.
    fn clone(&self) -> Self {
        self.deep_clone().expect("allocation failed during Mat::clone")
    }
}

impl PartialEq for Mat {
    fn eq(&self, other: &Self) -> bool {
        if self.is_empty() && other.is_empty() {
            return true;
        }
        self.shape() == other.shape() && self.elem_type == other.elem_type && self.as_bytes() == other.as_bytes()
    }
}

impl std::fmt::Debug for Mat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mat")
            .field("shape", &self.shape())
            .field("elem_type", &self.elem_type)
            .field("elempack", &self.elempack)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_fill() {
        let mut m = Mat::zeros_f32(&[2, 2]).unwrap();
        m.fill(3.0);
        assert!(m.as_f32_slice().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn empty_mat_has_zero_dims_and_no_storage() {
        let m = Mat::empty();
        assert!(m.is_empty());
        assert_eq!(m.total(), 0);
    }

    #[test]
    fn channel_view_shares_storage() {
        let mut m = Mat::create_3d(2, 2, 2, ElemType::F32, 1, None).unwrap();
        m.channel_f32_mut(0).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        m.channel_f32_mut(1).copy_from_slice(&[5.0, 6.0, 7.0, 8.0]);
        let view = m.channel_view(1);
        assert_eq!(view.dims, 2);
        assert_eq!(view.channel_f32(0), &[5.0, 6.0, 7.0, 8.0]);
        assert!(view.storage_is_shared());
    }

    #[test]
    fn deep_clone_is_independent() {
        let mut m = Mat::zeros_f32(&[4]).unwrap();
        m.as_f32_slice_mut().copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut cloned = m.deep_clone().unwrap();
        cloned.as_f32_slice_mut()[0] = 99.0;
        assert_eq!(m.as_f32_slice()[0], 1.0);
        assert_eq!(cloned.as_f32_slice()[0], 99.0);
    }

    #[test]
    fn reshape_preserves_values() {
        let m = Mat::from_f32_slice(&[4], &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let r = m.reshape(&[2, 2]).unwrap();
        assert_eq!(r.shape(), vec![2, 2]);
        assert_eq!(r.as_f32_slice()[..4], [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn reshape_rejects_mismatched_element_count() {
        let m = Mat::zeros_f32(&[4]).unwrap();
        assert!(m.reshape(&[3]).is_err());
    }
}
