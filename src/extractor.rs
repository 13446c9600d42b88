//! Per-call scheduler. Holds one `Mat` slot per blob; `extract(name)`
//! recursively resolves producers until the requested blob is populated.

use std::collections::HashSet;

use tracing::trace;

use crate::error::{NcnnError, Result};
use crate::net::Net;
use crate::option::RunOption;
use crate::tensor::Mat;

pub struct Extractor<'a> {
    net: &'a Net,
    blob_mats: Vec<Option<Mat>>,
    opt: RunOption,
    input_blobs: HashSet<usize>,
}

impl<'a> Extractor<'a> {
    pub fn new(net: &'a Net) -> Self {
        Self {
            net,
            blob_mats: vec![None; net.blobs.len()],
            opt: net.opt.clone(),
            input_blobs: HashSet::new(),
        }
    }

    /// Overrides the per-call option record; defaults to a clone of
    /// `net.opt` taken at construction, copied rather than referenced so
    /// a later mutation of `net.opt` can't retroactively change an
    /// in-flight extraction.
    pub fn with_option(mut self, opt: RunOption) -> Self {
        self.opt = opt;
        self
    }

    pub fn input(&mut self, name: &str, mat: Mat) -> Result<()> {
        let idx = self.net.blob_index(name).ok_or_else(|| NcnnError::BlobNotFound(name.to_string()))?;
        self.blob_mats[idx] = Some(mat);
        self.input_blobs.insert(idx);
        Ok(())
    }

    pub fn extract(&mut self, name: &str) -> Result<Mat> {
        let idx = self.net.blob_index(name).ok_or_else(|| NcnnError::BlobNotFound(name.to_string()))?;
        self.resolve_blob(idx)
    }

    fn resolve_blob(&mut self, blob_idx: usize) -> Result<Mat> {
        if let Some(mat) = &self.blob_mats[blob_idx] {
            return Ok(mat.share());
        }

        let producer = self.net.blobs[blob_idx].producer;
        if producer < 0 {
            return Err(NcnnError::BlobNotFound(self.net.blobs[blob_idx].name.clone()));
        }
        self.forward_layer(producer as usize)?;

        self.blob_mats[blob_idx]
            .as_ref()
            .map(Mat::share)
            .ok_or_else(|| NcnnError::BlobNotFound(self.net.blobs[blob_idx].name.clone()))
    }

    /// The scheduling algorithm:
    /// 1. if every top of this layer is already populated, it already ran.
    /// 2. resolve every bottom recursively.
    /// 3. decide in-place admissibility.
    /// 4. invoke forward (in-place or allocating).
    /// 5. publish outputs into their top blob slots.
    /// 6. lightmode reclamation of bottoms this layer was the sole consumer of.
    fn forward_layer(&mut self, layer_idx: usize) -> Result<()> {
        let net = self.net;
        let node = &net.layers[layer_idx];

        if !node.tops.is_empty() && node.tops.iter().all(|&t| self.blob_mats[t].is_some()) {
            return Ok(());
        }

        let mut bottom_mats = Vec::with_capacity(node.bottoms.len());
        for &b in &node.bottoms {
            bottom_mats.push(self.resolve_blob(b)?);
        }

        trace!(layer = %node.name, type_name = %node.type_name, "forward");

        let sole_consumer = node
            .bottoms
            .iter()
            .all(|&b| net.blobs[b].consumer == layer_idx as i32);
        let inplace_admissible = node.caps.support_inplace && self.opt.lightmode && sole_consumer;

        let outputs = if inplace_admissible {
            let mut mats = bottom_mats;
            for mat in mats.iter_mut() {
                if mat.storage_is_shared() {
                    *mat = mat.deep_clone()?;
                }
            }
            node.layer.forward_inplace(&mut mats, &self.opt)?;
            mats
        } else {
            node.layer.forward(&bottom_mats, &self.opt)?
        };

        if outputs.len() != node.tops.len() {
            return Err(NcnnError::ShapeMismatch {
                expected: vec![node.tops.len()],
                found: vec![outputs.len()],
            });
        }
        for (&top, mat) in node.tops.iter().zip(outputs.into_iter()) {
            self.blob_mats[top] = Some(mat);
        }

        if self.opt.lightmode {
            for &b in &node.bottoms {
                if net.blobs[b].consumer == layer_idx as i32 && !self.input_blobs.contains(&b) {
                    trace!(blob = %net.blobs[b].name, "lightmode reclaim");
                    self.blob_mats[b] = None;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn net_with_relu() -> Net {
        let mut net = Net::new();
        let src = Cursor::new(b"7767517\n2 2\nInput data 0 1 data\nReLU relu1 1 1 data out\n".to_vec());
        net.load_param(src).unwrap();
        net.create_pipeline().unwrap();
        net
    }

    #[test]
    fn extract_runs_the_graph() {
        let net = net_with_relu();
        let mut ex = Extractor::new(&net);
        ex.input("data", Mat::from_f32_slice(&[3], &[-1.0, 0.0, 2.0]).unwrap()).unwrap();
        let out = ex.extract("out").unwrap();
        assert_eq!(out.as_f32_slice(), &[0.0, 0.0, 2.0]);
    }

    #[test]
    fn extract_is_idempotent() {
        let net = net_with_relu();
        let mut ex = Extractor::new(&net);
        ex.input("data", Mat::from_f32_slice(&[2], &[-1.0, 2.0]).unwrap()).unwrap();
        let a = ex.extract("out").unwrap();
        let b = ex.extract("out").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_blob_is_error() {
        let net = net_with_relu();
        let mut ex = Extractor::new(&net);
        assert!(ex.extract("does_not_exist").is_err());
    }

    #[test]
    fn lightmode_never_reclaims_a_user_supplied_input() {
        let net = net_with_relu();
        let mut ex = Extractor::new(&net);
        ex.input("data", Mat::from_f32_slice(&[2], &[-1.0, 2.0]).unwrap()).unwrap();
        ex.extract("out").unwrap();
        let data_idx = net.blob_index("data").unwrap();
        // `data` was supplied via `input`, so it must survive reclamation
        // even though ReLU was its sole consumer.
        assert!(ex.blob_mats[data_idx].is_some());
    }

    #[test]
    fn lightmode_reclaims_intermediate_blob_after_sole_consumer_runs() {
        let mut net = Net::new();
        let src = Cursor::new(
            b"7767517\n3 3\nInput data 0 1 data\nReLU relu1 1 1 data mid\nSigmoid sig1 1 1 mid out\n".to_vec(),
        );
        net.load_param(src).unwrap();
        net.create_pipeline().unwrap();

        let mut ex = Extractor::new(&net);
        ex.input("data", Mat::from_f32_slice(&[2], &[-1.0, 2.0]).unwrap()).unwrap();
        ex.extract("out").unwrap();

        let mid_idx = net.blob_index("mid").unwrap();
        assert!(ex.blob_mats[mid_idx].is_none());
    }
}
