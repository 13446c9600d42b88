//! A `Blob` is a data edge in the graph: it has at most one producer and
//! at most one direct consumer. A freshly constructed blob sets `producer`
//! and `consumer` to -1 before anything is wired up.

use crate::tensor::Mat;

#[derive(Debug, Clone)]
pub struct Blob {
    pub name: String,
    /// Index of the layer that produces this blob, or -1 if none yet.
    pub producer: i32,
    /// Index of the layer that consumes this blob, or -1 if none yet.
    /// After `Split` insertion every blob has at most one consumer.
    pub consumer: i32,
    /// Shape/type hint used for pre-sizing; not authoritative until the
    /// layer that produces it actually runs.
    pub shape_hint: Mat,
}

impl Blob {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            producer: -1,
            consumer: -1,
            shape_hint: Mat::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_blob_has_no_producer_or_consumer() {
        let blob = Blob::new("data");
        assert_eq!(blob.producer, -1);
        assert_eq!(blob.consumer, -1);
    }
}
