//! End-to-end pulls through conversions.

mod common;

use approx::assert_relative_eq;
use colorflow_core::{
    ErrorKind, ImageSource, MemoryImage, NodeId, OptionValue, Options, PixelLayout, Rect, SampleType,
};
use colorflow_graph::filters::{DEPTH, IMAGE_OPTION, OFFSET, OUTPUT_IMAGE, ROOT_IMAGE, SCALE};
use colorflow_graph::{Conversion, Engine, EngineConfig, NodeState};
use common::{Probe, gray_2x2, offset, ramp};
use std::sync::Arc;

fn offset_node(conv: &Conversion) -> NodeId {
    conv.nodes()
        .find(|n| n.registration() == OFFSET)
        .map(|n| n.id())
        .unwrap()
}

#[test]
fn identity_chain_returns_source() {
    let engine = Engine::default().shared();
    let conv = Conversion::chain(engine, gray_2x2(), &[], None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();

    assert_eq!(ticket.buffer().as_bytes(), &[10, 20, 30, 40]);
    assert!(ticket.is_complete());
    assert!(!conv.is_dirty());
}

#[test]
fn zero_offset_is_identity() {
    let engine = Engine::default().shared();
    let conv = Conversion::chain(engine, gray_2x2(), &[offset("0")], None).unwrap();

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    assert_eq!(ticket.buffer().as_bytes(), &[10, 20, 30, 40]);
}

#[test]
fn f64_offset_keeps_precision() {
    let layout = PixelLayout::gray8().with_sample(SampleType::F64);
    let data = [0.1f64, 0.7].iter().flat_map(|v| v.to_le_bytes()).collect();
    let image = Arc::new(MemoryImage::from_vec(2, 1, layout, data).unwrap());
    let engine = Engine::default().shared();

    let read = |offset_by: &str| {
        let conv = Conversion::chain(engine.clone(), image.clone(), &[offset(offset_by)], None).unwrap();
        let mut ticket = conv.full_ticket().unwrap();
        conv.run_pixels(&mut ticket).unwrap();
        ticket
            .buffer()
            .as_bytes()
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes(b.try_into().unwrap()))
            .collect::<Vec<_>>()
    };

    assert_eq!(read("0"), vec![0.1, 0.7]);
    let shifted = read("0.25");
    assert_relative_eq!(shifted[0], 0.35, epsilon = 1e-12);
    assert_relative_eq!(shifted[1], 0.95, epsilon = 1e-12);
}

#[test]
fn option_change_between_runs() {
    let engine = Engine::default().shared();
    let mut conv = Conversion::chain(engine, gray_2x2(), &[offset("0")], None).unwrap();
    let node = offset_node(&conv);

    let mut first = conv.full_ticket().unwrap();
    conv.run_pixels(&mut first).unwrap();
    assert_eq!(first.buffer().as_bytes(), &[10, 20, 30, 40]);
    assert_eq!(conv.node_state(node), Some(NodeState::Ready));

    conv.set_option_text(node, "offset", "5").unwrap();
    assert_eq!(conv.node_state(node), Some(NodeState::Invalidated));

    let mut second = conv.full_ticket().unwrap();
    conv.run_pixels(&mut second).unwrap();
    assert_eq!(second.buffer().as_bytes(), &[15, 25, 35, 45]);
    assert_eq!(conv.node_state(node), Some(NodeState::Ready));
}

#[test]
fn each_node_sees_only_the_requested_rect() {
    let engine = Engine::default().shared();
    let first = Arc::new(Probe::default());
    let second = Arc::new(Probe::default());

    let mut conv = Conversion::new(engine);
    let source = Options::new().with(IMAGE_OPTION, OptionValue::Image(ramp(8, 8)));
    let root = conv.add_node(ROOT_IMAGE, source).unwrap();
    let a = conv.add_filter(first.clone(), Options::new());
    let b = conv.add_filter(second.clone(), Options::new());
    let out = conv.add_node(OUTPUT_IMAGE, Options::new()).unwrap();
    conv.connect(root, 0, a, 0).unwrap();
    conv.connect(a, 0, b, 0).unwrap();
    conv.connect(b, 0, out, 0).unwrap();
    conv.set_output(out).unwrap();

    let rect = Rect::new(2, 2, 4, 4);
    let mut ticket = conv.ticket(rect).unwrap();
    conv.run_pixels(&mut ticket).unwrap();

    assert_eq!(first.requests(), vec![rect]);
    assert_eq!(second.requests(), vec![rect]);
    for y in 0..4 {
        let expected: Vec<u8> = (0..4).map(|x| ((y + 2) * 8 + x + 2) as u8).collect();
        assert_eq!(ticket.buffer().row(y), expected.as_slice());
    }
}

#[test]
fn scale_pulls_outward_rounded_rect() {
    let engine = Engine::default().shared();
    let probe = Arc::new(Probe::default());

    let mut conv = Conversion::new(engine);
    let source = Options::new().with(IMAGE_OPTION, OptionValue::Image(ramp(4, 4)));
    let root = conv.add_node(ROOT_IMAGE, source).unwrap();
    let p = conv.add_filter(probe.clone(), Options::new());
    let scale = conv
        .add_node(SCALE, Options::new().with("factor", "2"))
        .unwrap();
    let out = conv.add_node(OUTPUT_IMAGE, Options::new()).unwrap();
    conv.connect(root, 0, p, 0).unwrap();
    conv.connect(p, 0, scale, 0).unwrap();
    conv.connect(scale, 0, out, 0).unwrap();
    conv.set_output(out).unwrap();

    let desc = conv.output_desc().unwrap();
    assert_eq!((desc.width, desc.height), (8, 8));

    let mut ticket = conv.ticket(Rect::new(2, 2, 2, 2)).unwrap();
    conv.run_pixels(&mut ticket).unwrap();

    assert_eq!(probe.requests(), vec![Rect::new(1, 1, 1, 1)]);
    assert_eq!(ticket.buffer().as_bytes(), &[5, 5, 5, 5]);
}

#[test]
fn unit_scale_copies_source() {
    let engine = Engine::default().shared();
    for options in [Options::new(), Options::new().with("factor", "1")] {
        let conv = Conversion::chain(engine.clone(), gray_2x2(), &[(SCALE, options)], None).unwrap();

        let mut ticket = conv.full_ticket().unwrap();
        conv.run_pixels(&mut ticket).unwrap();
        assert_eq!(ticket.buffer().as_bytes(), &[10, 20, 30, 40]);
        assert!(!conv.is_dirty());
    }
}

#[test]
fn depth_conversion_widens_samples() {
    let engine = Engine::default().shared();
    let image = Arc::new(MemoryImage::from_vec(2, 1, PixelLayout::gray8(), vec![0, 255]).unwrap());
    let conv = Conversion::chain(
        engine,
        image,
        &[(DEPTH, Options::new().with("sample_type", "u16"))],
        None,
    )
    .unwrap();

    let desc = conv.output_desc().unwrap();
    assert_eq!(desc.layout.sample(), SampleType::U16);

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    assert_eq!(ticket.buffer().as_bytes(), &[0, 0, 255, 255]);
}

#[test]
fn results_are_written_back() {
    let engine = Engine::default().shared();
    let destination = Arc::new(MemoryImage::new(2, 2, PixelLayout::gray8()));
    let conv = Conversion::chain(
        engine,
        gray_2x2(),
        &[offset("5")],
        Some(destination.clone() as Arc<dyn ImageSource>),
    )
    .unwrap();

    let mut ticket = conv.ticket(Rect::new(1, 0, 1, 2)).unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    assert_eq!(destination.to_vec(), vec![0, 25, 0, 45]);

    let mut ticket = conv.full_ticket().unwrap();
    conv.run_pixels(&mut ticket).unwrap();
    assert_eq!(destination.to_vec(), vec![15, 25, 35, 45]);
}

#[test]
fn striped_pull_matches_whole_pull() {
    let config = EngineConfig {
        stripe_rows: 1,
        ..EngineConfig::sequential()
    };
    let striped = Engine::with_builtins(config).shared();
    let whole = Engine::default().shared();
    let source = ramp(3, 5);

    let a = Conversion::chain(striped, source.clone(), &[offset("7")], None).unwrap();
    let b = Conversion::chain(whole, source, &[offset("7")], None).unwrap();

    let mut ta = a.full_ticket().unwrap();
    let mut tb = b.full_ticket().unwrap();
    a.run_pixels(&mut ta).unwrap();
    b.run_pixels(&mut tb).unwrap();

    assert_eq!(ta.cursor(), 5);
    assert_eq!(ta.buffer().as_bytes(), tb.buffer().as_bytes());
    assert_eq!(ta.buffer().row(4), &[19, 20, 21]);
}

#[test]
fn mismatched_destination_is_rejected() {
    let engine = Engine::default().shared();
    let destination: Arc<dyn ImageSource> = Arc::new(MemoryImage::new(3, 3, PixelLayout::gray8()));
    let conv = Conversion::chain(engine, gray_2x2(), &[], Some(destination)).unwrap();

    let err = conv.output_desc().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleData);
}
