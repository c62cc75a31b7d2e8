//! Connector negotiation between producers and consumers.

mod common;

use colorflow_core::{
    Connector, EngineResult, ErrorKind, MemoryImage, OptionValue, Options, PixelLayout,
    SampleType, Support,
};
use colorflow_graph::filters::{IMAGE_OPTION, OFFSET, OUTPUT_IMAGE, ROOT_IMAGE, SCALE};
use colorflow_graph::{
    ConnectError, Conversion, Engine, Filter, RegionIo, SharedContext, StreamDesc,
};
use common::gray_2x2;
use std::sync::Arc;

/// Generator with a configurable socket.
#[derive(Debug)]
struct Producer(Connector);

impl Filter for Producer {
    fn registration(&self) -> &str {
        "//test/producer.fixed"
    }

    fn plugs(&self) -> Vec<Connector> {
        Vec::new()
    }

    fn sockets(&self) -> Vec<Connector> {
        vec![self.0.clone()]
    }

    fn output_desc(&self, _inputs: &[StreamDesc], _options: &Options) -> EngineResult<StreamDesc> {
        Ok(StreamDesc::new(PixelLayout::gray8(), 1, 1))
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        io.generate_rows(|_, dst| {
            dst.fill(0);
            Ok(())
        })
    }
}

/// Pass-through accepting float samples only.
#[derive(Debug)]
struct FloatSink;

impl Filter for FloatSink {
    fn registration(&self) -> &str {
        "//test/sink.float"
    }

    fn plugs(&self) -> Vec<Connector> {
        vec![Connector::image().with_sample_types(&[SampleType::F32])]
    }

    fn output_desc(&self, inputs: &[StreamDesc], _options: &Options) -> EngineResult<StreamDesc> {
        Ok(inputs[0].clone())
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        io.copy_through()
    }
}

#[test]
fn planar_only_producer_cannot_feed_interleaved_consumer() {
    let mut conv = Conversion::new(Engine::default().shared());
    let producer = conv.add_filter(
        Arc::new(Producer(Connector::image().with_planar(Support::Always))),
        Options::new(),
    );
    let scale = conv.add_node(SCALE, Options::new()).unwrap();

    let err = conv.connect(producer, 0, scale, 0).unwrap_err();
    assert!(matches!(err, ConnectError::IncompatibleConnector { .. }));
    assert!(conv.node(scale).unwrap().plugs()[0].source.is_none());
    assert!(conv.node(producer).unwrap().sockets()[0].targets.is_empty());
}

#[test]
fn connector_kinds_must_agree() {
    let mut conv = Conversion::new(Engine::default().shared());
    let producer = conv.add_filter(
        Arc::new(Producer(Connector::new("//test/mask.data"))),
        Options::new(),
    );
    let offset = conv.add_node(OFFSET, Options::new()).unwrap();

    let err = conv.connect(producer, 0, offset, 0).unwrap_err();
    assert!(matches!(err, ConnectError::IncompatibleConnector { .. }));
    let engine_err: colorflow_core::EngineError = err.into();
    assert_eq!(engine_err.kind(), ErrorKind::IncompatibleConnector);
}

#[test]
fn concrete_layout_is_checked_at_pull_time() {
    let mut conv = Conversion::new(Engine::default().shared());
    let root = conv
        .add_node(ROOT_IMAGE, Options::new().with(IMAGE_OPTION, OptionValue::Image(gray_2x2())))
        .unwrap();
    let sink = conv.add_filter(Arc::new(FloatSink), Options::new());
    let out = conv.add_node(OUTPUT_IMAGE, Options::new()).unwrap();
    conv.connect(root, 0, sink, 0).unwrap();
    conv.connect(sink, 0, out, 0).unwrap();
    conv.set_output(out).unwrap();

    let err = conv.output_desc().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleData);
    assert_eq!(err.node(), Some(sink));
}

#[test]
fn planar_image_is_rejected_by_scale() {
    let layout = PixelLayout::rgb8().with_planar(true);
    let image = Arc::new(MemoryImage::from_vec(2, 1, layout, vec![1, 2, 3, 4, 5, 6]).unwrap());
    let conv = Conversion::chain(
        Engine::default().shared(),
        image,
        &[(SCALE, Options::new().with("factor", "2"))],
        None,
    )
    .unwrap();

    let err = conv.full_ticket().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleData);
}

#[test]
fn unconnected_mandatory_plug_fails_validation() {
    let mut conv = Conversion::new(Engine::default().shared());
    let out = conv.add_node(OUTPUT_IMAGE, Options::new()).unwrap();
    conv.set_output(out).unwrap();

    assert!(matches!(conv.validate(), Err(ConnectError::Unconnected(_))));
    let err = conv.output_desc().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IncompatibleConnector);
}
