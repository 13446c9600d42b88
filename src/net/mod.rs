//! Topology + weight loader. `Net::load_param` parses the
//! textual topology format: a magic line (`"7767517"`, ncnn's actual
//! literal magic), a `layer_count blob_count` line, then one line per
//! layer. `Net::load_model` streams weights into already-constructed
//! layers in declaration order. `create_pipeline` finalizes every layer
//! for a given `RunOption`.

use std::collections::HashMap;
use std::io::{BufRead, Read};

use tracing::{debug, info};

use crate::blob::Blob;
use crate::error::{NcnnError, Result};
use crate::layer::{Layer, LayerCaps, LayerRegistry};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;

/// ncnn's literal param-file magic number.
pub const MAGIC: &str = "7767517";

pub struct LayerNode {
    pub layer: Box<dyn Layer>,
    pub type_name: String,
    pub name: String,
    pub bottoms: Vec<usize>,
    pub tops: Vec<usize>,
    pub caps: LayerCaps,
}

pub struct Net {
    registry: LayerRegistry,
    pub layers: Vec<LayerNode>,
    pub blobs: Vec<Blob>,
    pub opt: RunOption,
}

/// Intermediate representation of one topology line, before Split
/// insertion has rewritten shared-blob references.
struct RawLayer {
    type_name: String,
    name: String,
    bottoms: Vec<usize>,
    tops: Vec<usize>,
    params: ParamDict,
}

impl Net {
    pub fn new() -> Self {
        Self {
            registry: LayerRegistry::with_builtins(),
            layers: Vec::new(),
            blobs: Vec::new(),
            opt: RunOption::default(),
        }
    }

    /// Registers an override bound to a specific layer *instance* name,
    /// highest priority in the layer-construction resolution order.
    pub fn register_layer(&mut self, instance_name: impl Into<String>, ctor: fn() -> Box<dyn Layer>) {
        self.registry.register_override(instance_name, ctor);
    }

    pub fn blob_index(&self, name: &str) -> Option<usize> {
        self.blobs.iter().position(|b| b.name == name)
    }

    /// Parses the textual topology and constructs every layer. On any
    /// parse error, `self` is left unmodified (partial state never
    /// becomes visible) since all parsing happens into local buffers
    /// before anything is written into `self.layers`/`self.blobs`.
    pub fn load_param(&mut self, reader: impl BufRead) -> Result<()> {
        let (raw_layers, blob_names) = parse_topology(reader)?;
        let (raw_layers, blob_names) = insert_splits(raw_layers, blob_names, &self.registry, &self.opt)?;

        let mut blobs: Vec<Blob> = blob_names.into_iter().map(Blob::new).collect();
        let mut layers = Vec::with_capacity(raw_layers.len());

        for (i, raw) in raw_layers.into_iter().enumerate() {
            let mut layer = self.registry.construct(&raw.type_name, &raw.name, &self.opt)?;
            layer.load_param(&raw.params)?;
            let caps = layer.caps();

            for &top in &raw.tops {
                blobs[top].producer = i as i32;
            }
            for &bottom in &raw.bottoms {
                blobs[bottom].consumer = i as i32;
            }

            layers.push(LayerNode {
                layer,
                type_name: raw.type_name,
                name: raw.name,
                bottoms: raw.bottoms,
                tops: raw.tops,
                caps,
            });
        }

        info!(layer_count = layers.len(), blob_count = blobs.len(), "topology loaded");
        self.layers = layers;
        self.blobs = blobs;
        Ok(())
    }

    /// Streams weights into every layer, in declaration order.
    pub fn load_model(&mut self, mb: &mut dyn ModelBin) -> Result<()> {
        for node in &mut self.layers {
            node.layer.load_model(mb)?;
        }
        info!(layer_count = self.layers.len(), "weights loaded");
        Ok(())
    }

    pub fn create_pipeline(&mut self) -> Result<()> {
        for node in &mut self.layers {
            debug!(layer = %node.name, "create_pipeline");
            node.layer.create_pipeline(&self.opt)?;
        }
        Ok(())
    }

    pub fn destroy_pipeline(&mut self) -> Result<()> {
        for node in &mut self.layers {
            node.layer.destroy_pipeline(&self.opt)?;
        }
        Ok(())
    }
}

impl Default for Net {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_topology(mut reader: impl BufRead) -> Result<(Vec<RawLayer>, Vec<String>)> {
    let mut magic = String::new();
    reader.read_line(&mut magic)?;
    if magic.trim() != MAGIC {
        return Err(NcnnError::MalformedTopology(format!("bad magic: {:?}", magic.trim())));
    }

    let mut counts_line = String::new();
    reader.read_line(&mut counts_line)?;
    let mut counts = counts_line.split_whitespace();
    let layer_count: usize = counts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| NcnnError::MalformedTopology("missing layer_count".into()))?;
    let blob_count_hint: usize = counts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| NcnnError::MalformedTopology("missing blob_count".into()))?;

    let mut blob_index: HashMap<String, usize> = HashMap::new();
    let mut blob_names: Vec<String> = Vec::new();
    let mut raw_layers = Vec::with_capacity(layer_count);

    for _ in 0..layer_count {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(NcnnError::MalformedTopology("unexpected end of topology".into()));
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 4 {
            return Err(NcnnError::MalformedTopology(format!("layer line too short: {line:?}")));
        }
        let type_name = tokens[0].to_string();
        let name = tokens[1].to_string();
        let nbottom: usize = tokens[2]
            .parse()
            .map_err(|_| NcnnError::MalformedTopology(format!("bad bottom count: {}", tokens[2])))?;
        let ntop: usize = tokens[3]
            .parse()
            .map_err(|_| NcnnError::MalformedTopology(format!("bad top count: {}", tokens[3])))?;

        let mut cursor = 4;
        let mut bottoms = Vec::with_capacity(nbottom);
        for _ in 0..nbottom {
            let blob_name = tokens.get(cursor).ok_or_else(|| NcnnError::MalformedTopology("missing bottom name".into()))?;
            bottoms.push(intern(&mut blob_index, &mut blob_names, blob_name));
            cursor += 1;
        }
        let mut tops = Vec::with_capacity(ntop);
        for _ in 0..ntop {
            let blob_name = tokens.get(cursor).ok_or_else(|| NcnnError::MalformedTopology("missing top name".into()))?;
            tops.push(intern(&mut blob_index, &mut blob_names, blob_name));
            cursor += 1;
        }

        let params = ParamDict::parse_tokens(&tokens[cursor..])?;
        raw_layers.push(RawLayer { type_name, name, bottoms, tops, params });
    }

    if blob_names.len() != blob_count_hint {
        return Err(NcnnError::MalformedTopology(format!(
            "declared blob_count {blob_count_hint} does not match {} distinct blob names",
            blob_names.len()
        )));
    }

    Ok((raw_layers, blob_names))
}

fn intern(index: &mut HashMap<String, usize>, names: &mut Vec<String>, name: &str) -> usize {
    if let Some(&idx) = index.get(name) {
        return idx;
    }
    let idx = names.len();
    names.push(name.to_string());
    index.insert(name.to_string(), idx);
    idx
}

/// Rewrites `raw_layers`/`blob_names` so every blob has at most one
/// consumer, synthesizing a `Split` layer for each blob
/// that the raw parse found referenced as a bottom more than once.
fn insert_splits(
    mut raw_layers: Vec<RawLayer>,
    mut blob_names: Vec<String>,
    registry: &LayerRegistry,
    opt: &RunOption,
) -> Result<(Vec<RawLayer>, Vec<String>)> {
    let blob_count = blob_names.len();
    let mut consumers: Vec<Vec<(usize, usize)>> = vec![Vec::new(); blob_count];
    for (layer_idx, raw) in raw_layers.iter().enumerate() {
        for (pos, &blob_idx) in raw.bottoms.iter().enumerate() {
            consumers[blob_idx].push((layer_idx, pos));
        }
    }

    let mut split_layers = Vec::new();
    for (blob_idx, uses) in consumers.into_iter().enumerate() {
        if uses.len() <= 1 {
            continue;
        }

        let base_name = blob_names[blob_idx].clone();
        let mut new_tops = Vec::with_capacity(uses.len());
        for i in 0..uses.len() {
            let new_name = format!("{base_name}_splitncnn_{i}");
            blob_names.push(new_name);
            new_tops.push(blob_names.len() - 1);
        }

        for (&(layer_idx, pos), &new_blob) in uses.iter().zip(new_tops.iter()) {
            raw_layers[layer_idx].bottoms[pos] = new_blob;
        }

        let split_name = format!("splitncnn_{blob_idx}");
        let mut params = ParamDict::new();
        params.set(0, crate::param_dict::ParamValue::Int(uses.len() as i32));

        // Validate the type constructs cleanly against the registry
        // before committing to the rewrite (mirrors the loader's
        // general "no partial state on error" contract).
        let _ = registry.construct("Split", &split_name, opt)?;

        split_layers.push(RawLayer {
            type_name: "Split".to_string(),
            name: split_name,
            bottoms: vec![blob_idx],
            tops: new_tops,
            params,
        });
    }

    raw_layers.extend(split_layers);
    Ok((raw_layers, blob_names))
}
