//! Compact inference engine core: static computation graph (`Blob`,
//! `Layer`, `Net`), a per-call `Extractor` scheduler, and a small
//! representative corpus of concrete layers.

pub mod allocator;
pub mod backend;
pub mod blob;
pub mod error;
pub mod extractor;
pub mod layer;
pub mod layers;
pub mod model_bin;
pub mod net;
pub mod option;
pub mod param_dict;
pub mod parallel;
pub mod tensor;

#[cfg(test)]
pub mod logging;

pub use blob::Blob;
pub use error::{NcnnError, Result};
pub use extractor::Extractor;
pub use layer::{Layer, LayerCaps};
pub use model_bin::{ModelBin, RawModelBin, TaggedModelBin};
pub use net::Net;
pub use option::RunOption;
pub use param_dict::{ParamDict, ParamValue};
pub use tensor::{ElemType, Mat};
