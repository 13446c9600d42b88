//! The per-node operator contract and the process-global type registry
//! layers are constructed from by name. Construction here is driven by a
//! type-name string read from the topology file, so the registry is a
//! plain `HashMap` keyed by that string rather than a trait-object
//! deserialization table.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{NcnnError, Result};
use crate::model_bin::ModelBin;
use crate::option::RunOption;
use crate::param_dict::ParamDict;
use crate::tensor::Mat;

/// Capability flags a layer advertises to the scheduler. Trims ncnn's
/// ten `support_reserved_*` ABI-padding fields — those exist in the C++
/// original to keep a stable dynamic-library layout and have no purpose
/// here, with no stable-ABI requirement (see DESIGN.md).
#[derive(Debug, Clone, Copy, Default)]
pub struct LayerCaps {
    pub one_blob_only: bool,
    pub support_inplace: bool,
    pub support_vulkan: bool,
    pub support_packing: bool,
    pub support_bf16_storage: bool,
    pub support_fp16_storage: bool,
    pub support_int8_storage: bool,
}

/// A per-layer-type operator. Default method bodies return
/// `BackendUnavailable` so a concrete layer only needs to override the
/// variants it actually supports (ncnn's C++ virtuals default to "not
/// implemented"; this is that default translated to `Result`).
pub trait Layer: Send + Sync {
    fn caps(&self) -> LayerCaps {
        LayerCaps::default()
    }

    /// Parses and stores this layer's parameters; nothing here gates on
    /// a per-layer feature mask, since this crate has no runtime
    /// ISA/GPU dispatch to gate.
    fn load_param(&mut self, _pd: &ParamDict) -> Result<()> {
        Ok(())
    }

    fn load_model(&mut self, _mb: &mut dyn ModelBin) -> Result<()> {
        Ok(())
    }

    fn create_pipeline(&mut self, _opt: &RunOption) -> Result<()> {
        Ok(())
    }

    fn destroy_pipeline(&mut self, _opt: &RunOption) -> Result<()> {
        Ok(())
    }

    fn forward(&self, _bottoms: &[Mat], _opt: &RunOption) -> Result<Vec<Mat>> {
        Err(NcnnError::BackendUnavailable("forward not implemented".into()))
    }

    fn forward_inplace(&self, _mats: &mut [Mat], _opt: &RunOption) -> Result<()> {
        Err(NcnnError::BackendUnavailable("forward_inplace not implemented".into()))
    }
}

/// Registry entry: currently only the scalar constructor is ever
/// populated. The `Simd` variant is a forward-compatible seam so a
/// future SIMD backend can register without an API break; nothing
/// populates it yet (no runtime codegen/ISA dispatch in this crate).
pub enum LayerFactory {
    Scalar(fn() -> Box<dyn Layer>),
    Simd(fn() -> Box<dyn Layer>),
}

impl LayerFactory {
    fn construct(&self) -> Box<dyn Layer> {
        match self {
            LayerFactory::Scalar(f) => f(),
            LayerFactory::Simd(f) => f(),
        }
    }
}

#[derive(Default)]
pub struct LayerRegistry {
    entries: HashMap<&'static str, LayerFactory>,
    overrides: HashMap<String, LayerFactory>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: &'static str, ctor: fn() -> Box<dyn Layer>) {
        self.entries.insert(type_name, LayerFactory::Scalar(ctor));
    }

    /// Explicit per-instance override, highest priority in the
    /// resolution order: an override fn bound to a specific layer
    /// *name* beats the type's registered constructor.
    pub fn register_override(&mut self, layer_name: impl Into<String>, ctor: fn() -> Box<dyn Layer>) {
        self.overrides.insert(layer_name.into(), LayerFactory::Scalar(ctor));
    }

    /// Resolution order: explicit override by instance name, then GPU
    /// (unimplemented, falls through since `support_vulkan` is never
    /// set on a registered scalar layer), then scalar.
    pub fn construct(&self, type_name: &str, instance_name: &str, opt: &RunOption) -> Result<Box<dyn Layer>> {
        if let Some(factory) = self.overrides.get(instance_name) {
            return Ok(factory.construct());
        }

        let factory = self
            .entries
            .get(type_name)
            .ok_or_else(|| NcnnError::UnknownLayerType(type_name.to_string()))?;

        let layer = factory.construct();
        if opt.use_vulkan_compute && layer.caps().support_vulkan {
            // GPU dispatch is an unimplemented trait seam; fall through
            // to the scalar layer.
        }
        Ok(layer)
    }
}

/// Process-wide registry of the built-in layer types, populated lazily
/// and idempotently on first use.
pub fn builtin_registry() -> &'static LayerRegistry {
    static REGISTRY: OnceLock<LayerRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut reg = LayerRegistry::new();
        crate::layers::register_all(&mut reg);
        reg
    })
}

impl LayerRegistry {
    /// A fresh registry pre-populated with every built-in layer type.
    /// Separate from [`builtin_registry`] so a `Net` can hold its own
    /// registry and add per-instance overrides without mutating global
    /// state.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        crate::layers::register_all(&mut reg);
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    impl Layer for Noop {}

    #[test]
    fn unknown_type_is_error() {
        let reg = LayerRegistry::new();
        let opt = RunOption::default();
        assert!(reg.construct("DoesNotExist", "x", &opt).is_err());
    }

    #[test]
    fn registered_type_constructs() {
        let mut reg = LayerRegistry::new();
        reg.register("Noop", || Box::new(Noop));
        let opt = RunOption::default();
        assert!(reg.construct("Noop", "x", &opt).is_ok());
    }

    #[test]
    fn override_takes_priority_over_type() {
        let mut reg = LayerRegistry::new();
        reg.register("Noop", || Box::new(Noop));
        reg.register_override("specific_instance", || Box::new(Noop));
        let opt = RunOption::default();
        assert!(reg.construct("Noop", "specific_instance", &opt).is_ok());
    }

    #[test]
    fn default_forward_is_backend_unavailable() {
        let layer = Noop;
        let opt = RunOption::default();
        assert!(layer.forward(&[], &opt).is_err());
    }
}
