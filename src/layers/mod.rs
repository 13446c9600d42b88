pub mod bias;
pub mod cast;
pub mod clip;
pub mod concat;
pub mod convolution;
pub mod input;
pub mod inner_product;
pub mod mish;
pub mod pooling;
pub mod relu;
pub mod sigmoid;
pub mod slice;
pub mod softmax;
pub mod split;

use crate::layer::LayerRegistry;

/// Populates the process-global registry with every built-in layer type.
pub fn register_all(reg: &mut LayerRegistry) {
    reg.register("ReLU", || Box::new(relu::ReLU::default()));
    reg.register("Bias", || Box::new(bias::Bias::default()));
    reg.register("Cast", || Box::new(cast::Cast::default()));
    reg.register("Sigmoid", || Box::new(sigmoid::Sigmoid));
    reg.register("Mish", || Box::new(mish::Mish));
    reg.register("Clip", || Box::new(clip::Clip::default()));
    reg.register("Pooling", || Box::new(pooling::Pooling::default()));
    reg.register("Convolution", || Box::new(convolution::Convolution::default()));
    reg.register("InnerProduct", || Box::new(inner_product::InnerProduct::default()));
    reg.register("Softmax", || Box::new(softmax::Softmax::default()));
    reg.register("Concat", || Box::new(concat::Concat));
    reg.register("Slice", || Box::new(slice::Slice::default()));
    reg.register("Split", || Box::new(split::Split::default()));
    reg.register("Input", || Box::new(input::Input));
}
