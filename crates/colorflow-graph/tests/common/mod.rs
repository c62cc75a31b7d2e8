//! Filters and images shared by the integration tests.

#![allow(dead_code)]

use colorflow_core::{
    Connector, EngineResult, MemoryImage, NodeId, Options, PixelLayout, Rect,
};
use colorflow_graph::filters::{OFFSET, OffsetFilter, OUTPUT_IMAGE};
use colorflow_graph::{
    Conversion, Engine, EngineConfig, Filter, RegionIo, SharedContext, StreamDesc,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const COUNTING_OFFSET: &str = "//test/offset.counting";
pub const PROBE: &str = "//test/probe.record";
pub const ROWS: &str = "//test/rows.generate";

/// The 2x2 gray image `[10, 20, 30, 40]`.
pub fn gray_2x2() -> Arc<MemoryImage> {
    Arc::new(MemoryImage::from_vec(2, 2, PixelLayout::gray8(), vec![10, 20, 30, 40]).unwrap())
}

/// Gray image whose pixel at `(x, y)` is `y * width + x`.
pub fn ramp(width: u32, height: u32) -> Arc<MemoryImage> {
    let data = (0..width * height).map(|v| v as u8).collect();
    Arc::new(MemoryImage::from_vec(width, height, PixelLayout::gray8(), data).unwrap())
}

/// Engine with the built-ins plus `extra`.
pub fn engine_with(config: EngineConfig, extra: Vec<Arc<dyn Filter>>) -> Arc<Engine> {
    let mut engine = Engine::with_builtins(config);
    for filter in extra {
        engine.register(filter).unwrap();
    }
    engine.shared()
}

/// Offset filter that counts its context builds.
#[derive(Debug, Default)]
pub struct CountingOffset {
    pub builds: AtomicUsize,
    pub delay: Option<Duration>,
}

impl CountingOffset {
    pub fn slow(delay: Duration) -> Self {
        Self {
            builds: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl Filter for CountingOffset {
    fn registration(&self) -> &str {
        COUNTING_OFFSET
    }

    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        OffsetFilter.output_desc(inputs, options)
    }

    fn needs_context(&self) -> bool {
        true
    }

    fn affects_context(&self, key: &str) -> bool {
        OffsetFilter.affects_context(key)
    }

    fn build_context(
        &self,
        inputs: &[StreamDesc],
        output: &StreamDesc,
        options: &Options,
    ) -> EngineResult<SharedContext> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        OffsetFilter.build_context(inputs, output, options)
    }

    fn execute(
        &self,
        context: Option<&SharedContext>,
        options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        OffsetFilter.execute(context, options, io)
    }
}

/// Pass-through that records every rectangle it is asked for.
#[derive(Debug, Default)]
pub struct Probe {
    pub requests: Mutex<Vec<Rect>>,
}

impl Probe {
    pub fn requests(&self) -> Vec<Rect> {
        self.requests.lock().unwrap().clone()
    }
}

impl Filter for Probe {
    fn registration(&self) -> &str {
        PROBE
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
        self.requests.lock().unwrap().push(io.rect());
        io.copy_through()
    }
}

/// Generator filling row `y` with `y + 1`. Cancels its own ticket while
/// producing row `cancel_at`.
#[derive(Debug)]
pub struct Rows {
    pub width: u32,
    pub height: u32,
    pub cancel_at: Option<u32>,
}

impl Filter for Rows {
    fn registration(&self) -> &str {
        ROWS
    }

    fn plugs(&self) -> Vec<Connector> {
        Vec::new()
    }

    fn output_desc(&self, _inputs: &[StreamDesc], _options: &Options) -> EngineResult<StreamDesc> {
        Ok(StreamDesc::new(PixelLayout::gray8(), self.width, self.height))
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        let top = io.rect().y;
        let cancel = io.cancel_token().clone();
        let cancel_at = self.cancel_at;
        io.generate_rows(|y, dst| {
            let row = top + y;
            if Some(row) == cancel_at {
                cancel.cancel();
            }
            dst.fill(row as u8 + 1);
            Ok(())
        })
    }
}

/// `generator -> output` conversion.
pub fn generator_conversion(engine: Arc<Engine>, rows: Rows) -> (Conversion, NodeId) {
    let mut conv = Conversion::new(engine);
    let generator = conv.add_filter(Arc::new(rows), Options::new());
    let output = conv.add_node(OUTPUT_IMAGE, Options::new()).unwrap();
    conv.connect(generator, 0, output, 0).unwrap();
    conv.set_output(output).unwrap();
    (conv, generator)
}

/// Options of the built-in offset filter.
pub fn offset(value: &str) -> (&'static str, Options) {
    (OFFSET, Options::new().with("offset", value))
}
