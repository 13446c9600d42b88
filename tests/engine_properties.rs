use std::io::Cursor;
use std::sync::Arc;

use gp_infer::allocator::{Allocator, PooledAllocator};
use gp_infer::{Extractor, Mat, Net, RunOption};

fn build_net(topology: &str) -> Net {
    let mut net = Net::new();
    net.load_param(Cursor::new(topology.as_bytes().to_vec())).unwrap();
    net.create_pipeline().unwrap();
    net
}

#[test]
fn shared_storage_survives_until_every_handle_drops() {
    let alloc: Arc<dyn Allocator> = Arc::new(PooledAllocator::default());
    let mut a = Mat::create_1d(4, gp_infer::ElemType::F32, 1, Some(alloc.clone())).unwrap();
    a.fill(7.0);
    let shared = a.share();

    drop(a);
    // `shared` still aliases the same storage, so it must still read
    // back the value written through the original handle.
    assert_eq!(shared.as_f32_slice(), &[7.0, 7.0, 7.0, 7.0]);
    drop(shared);

    // The allocator itself can be reused for an unrelated allocation
    // once both handles are gone.
    let b = Mat::create_1d(4, gp_infer::ElemType::F32, 1, Some(alloc)).unwrap();
    assert_eq!(b.total(), 4);
}

#[test]
fn every_blob_has_at_most_one_producer_and_one_consumer_after_split_insertion() {
    let net = build_net(
        "7767517\n4 3\nInput data 0 1 data\nReLU relu1 1 1 data out1\nSigmoid sig1 1 1 data out2\n",
    );

    // Every blob must have a single producer index (or -1 for a
    // user-supplied input), and at most one consumer after the loader
    // has synthesized Split nodes for any originally-shared blob.
    let mut consumer_counts = vec![0usize; net.blobs.len()];
    for layer in &net.layers {
        for &b in &layer.bottoms {
            consumer_counts[b] += 1;
        }
    }
    for (idx, count) in consumer_counts.iter().enumerate() {
        assert!(*count <= 1, "blob {idx} ({}) has {count} consumers", net.blobs[idx].name);
    }

    let mut producer_counts = vec![0usize; net.blobs.len()];
    for layer in &net.layers {
        for &t in &layer.tops {
            producer_counts[t] += 1;
        }
    }
    for (idx, count) in producer_counts.iter().enumerate() {
        assert!(*count <= 1, "blob {idx} ({}) has {count} producers", net.blobs[idx].name);
    }
}

#[test]
fn repeated_extraction_with_identical_input_is_deterministic() {
    let net = build_net(
        "7767517\n3 3\nInput data 0 1 data\nReLU relu1 1 1 data mid\nSigmoid sig1 1 1 mid out\n",
    );

    let input = Mat::from_f32_slice(&[4], &[-2.0, -0.5, 0.25, 3.0]).unwrap();

    let mut first = Extractor::new(&net);
    first.input("data", input.clone()).unwrap();
    let out_a = first.extract("out").unwrap();

    let mut second = Extractor::new(&net);
    second.input("data", input).unwrap();
    let out_b = second.extract("out").unwrap();

    assert_eq!(out_a.as_f32_slice(), out_b.as_f32_slice());
}

#[test]
fn lightmode_does_not_change_the_result_it_only_changes_retention() {
    let topology = "7767517\n3 3\nInput data 0 1 data\nReLU relu1 1 1 data mid\nSigmoid sig1 1 1 mid out\n";
    let input = Mat::from_f32_slice(&[4], &[-2.0, -0.5, 0.25, 3.0]).unwrap();

    let net_lightmode_on = build_net(topology);
    let mut ex_on = Extractor::new(&net_lightmode_on).with_option(RunOption {
        lightmode: true,
        ..net_lightmode_on.opt.clone()
    });
    ex_on.input("data", input.clone()).unwrap();
    let out_on = ex_on.extract("out").unwrap();

    let net_lightmode_off = build_net(topology);
    let mut ex_off = Extractor::new(&net_lightmode_off).with_option(RunOption {
        lightmode: false,
        ..net_lightmode_off.opt.clone()
    });
    ex_off.input("data", input).unwrap();
    let out_off = ex_off.extract("out").unwrap();

    assert_eq!(out_on.as_f32_slice(), out_off.as_f32_slice());
}

#[test]
fn reclaimed_intermediate_blob_recomputes_correctly_on_a_later_request() {
    // Under lightmode, "a" and "b" are reclaimed once `out` has
    // consumed them. Requesting "a" afterwards forces the extractor to
    // re-run the producing layer rather than returning stale state, and
    // the recomputed value must still match a request made before any
    // reclamation happened.
    let net = build_net(
        "7767517\n4 4\nInput data 0 1 data\nReLU relu1 1 1 data a\nSigmoid sig1 1 1 a b\nReLU relu2 1 1 b out\n",
    );

    let mut ex = Extractor::new(&net);
    ex.input("data", Mat::from_f32_slice(&[3], &[-1.0, 0.0, 1.0]).unwrap()).unwrap();
    let a_before = ex.extract("a").unwrap();
    ex.extract("out").unwrap();
    let a_after = ex.extract("a").unwrap();

    assert_eq!(a_before.as_f32_slice(), a_after.as_f32_slice());
}
