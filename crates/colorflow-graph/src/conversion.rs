//! Conversions: filter graphs and the pull protocol.
//!
//! A [`Conversion`] owns an acyclic set of [`FilterNode`]s, with one node
//! designated as output (and optionally one as input). Pixels are produced
//! by pulling a rectangle from the output node:
//!
//! 1. every node's stream is described, from the roots down
//! 2. each node asked for a rectangle makes sure its context is built,
//!    maps the rectangle into its inputs' coordinates (rounding outward)
//!    and pulls those rectangles from upstream
//! 3. the node then executes over exactly the requested rectangle
//!
//! When a node does not change the layout or the rectangle, its input is
//! pulled straight into its output view and transformed in place. Otherwise
//! each input gets an intermediate buffer.
//!
//! # Example
//!
//! ```rust
//! use colorflow_core::{MemoryImage, Options, PixelLayout, Rect};
//! use colorflow_graph::{Conversion, Engine, EngineConfig};
//! use std::sync::Arc;
//!
//! let engine = Engine::with_builtins(EngineConfig::default()).shared();
//! let image = MemoryImage::from_vec(2, 2, PixelLayout::gray8(), vec![10, 20, 30, 40]).unwrap();
//! let offset = Options::new().with("offset", "5");
//! let conv = Conversion::chain(engine, Arc::new(image), &[("//colour/offset", offset)], None).unwrap();
//!
//! let mut ticket = conv.ticket(Rect::from_size(2, 2)).unwrap();
//! conv.run_pixels(&mut ticket).unwrap();
//! assert_eq!(ticket.buffer().as_bytes(), &[15, 25, 35, 45]);
//! ```

use crate::engine::Engine;
use crate::error::{ConnectError, ConnectResult};
use crate::filter::{Filter, RegionIo, SharedContext, Source, StreamDesc};
use crate::filters::{IMAGE_OPTION, OUTPUT_IMAGE, ROOT_IMAGE};
use crate::key::ContextKey;
use crate::node::{FilterNode, NodeState};
use crate::ticket::{CancelToken, PixelAccessTicket};
use colorflow_core::{
    BufferViewMut, Connector, EngineError, EngineResult, ImageSource, NodeId, OptionValue,
    Options, PixelBuffer, Rect, copy_row_span,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, trace, warn};

static NEXT_CONVERSION: AtomicU64 = AtomicU64::new(1);

/// Streams entering and leaving one node.
#[derive(Debug, Clone)]
struct Resolved {
    inputs: Vec<StreamDesc>,
    output: StreamDesc,
}

type Streams = HashMap<NodeId, Resolved>;

/// A filter graph between an input and an output node.
#[derive(Debug)]
pub struct Conversion {
    id: u64,
    engine: Arc<Engine>,
    nodes: HashMap<NodeId, FilterNode>,
    next_id: u32,
    input: Option<NodeId>,
    output: Option<NodeId>,
    dirty: AtomicBool,
}

impl Conversion {
    /// Creates an empty conversion.
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            id: NEXT_CONVERSION.fetch_add(1, Ordering::Relaxed),
            engine,
            nodes: HashMap::new(),
            next_id: 1,
            input: None,
            output: None,
            dirty: AtomicBool::new(false),
        }
    }

    /// Builds `source -> filters... -> output` in one go.
    ///
    /// Each entry of `filters` is a registration pattern and its options.
    /// When `destination` is given, successful pulls are written into it.
    pub fn chain(
        engine: Arc<Engine>,
        source: Arc<dyn ImageSource>,
        filters: &[(&str, Options)],
        destination: Option<Arc<dyn ImageSource>>,
    ) -> EngineResult<Self> {
        let mut conv = Self::new(engine);
        let root = conv.add_node(
            ROOT_IMAGE,
            Options::new().with(IMAGE_OPTION, OptionValue::Image(source)),
        )?;
        conv.set_input(root)?;

        let mut last = root;
        for (pattern, options) in filters {
            let id = conv.add_node(pattern, options.clone())?;
            conv.connect(last, 0, id, 0)?;
            last = id;
        }

        let mut out_opts = Options::new();
        if let Some(image) = destination {
            out_opts.set(IMAGE_OPTION, OptionValue::Image(image));
        }
        let out = conv.add_node(OUTPUT_IMAGE, out_opts)?;
        conv.connect(last, 0, out, 0)?;
        conv.set_output(out)?;
        Ok(conv)
    }

    /// Process-unique id; tickets carry it.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The engine.
    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Adds a node for the registered filter matching `pattern`.
    pub fn add_node(&mut self, pattern: &str, options: Options) -> EngineResult<NodeId> {
        let filter = self.engine.resolve(pattern)?;
        Ok(self.add_filter(filter, options))
    }

    /// Adds a node for a filter instance, registered or not.
    pub fn add_filter(&mut self, filter: Arc<dyn Filter>, options: Options) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        debug!(node = %id, registration = filter.registration(), "node added");
        self.nodes.insert(id, FilterNode::new(id, filter, options));
        id
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Option<&FilterNode> {
        self.nodes.get(&id)
    }

    /// All nodes, in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &FilterNode> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the conversion has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn get(&self, id: NodeId) -> ConnectResult<&FilterNode> {
        self.nodes.get(&id).ok_or(ConnectError::NodeNotFound(id))
    }

    fn get_mut(&mut self, id: NodeId) -> ConnectResult<&mut FilterNode> {
        self.nodes.get_mut(&id).ok_or(ConnectError::NodeNotFound(id))
    }

    /// Removes a node and every edge touching it.
    ///
    /// Nodes downstream of it are invalidated.
    pub fn remove_node(&mut self, id: NodeId) -> ConnectResult<()> {
        self.get(id)?;
        let affected = self.downstream_of(id);
        let Some(node) = self.nodes.remove(&id) else {
            return Err(ConnectError::NodeNotFound(id));
        };

        for (plug, p) in node.plugs().iter().enumerate() {
            if let Some((src, socket)) = p.source {
                self.unlink_socket(src, socket, (id, plug));
            }
        }
        for socket in node.sockets() {
            for (dst, plug) in &socket.targets {
                if let Some(p) = self
                    .nodes
                    .get_mut(dst)
                    .and_then(|consumer| consumer.plugs_mut().get_mut(*plug))
                {
                    p.source = None;
                }
            }
        }
        if self.input == Some(id) {
            self.input = None;
        }
        if self.output == Some(id) {
            self.output = None;
        }
        for other in affected {
            if let Some(n) = self.nodes.get(&other) {
                n.invalidate();
            }
        }
        debug!(node = %id, "node removed");
        Ok(())
    }

    /// Connects socket `socket` of `from` to plug `plug` of `to`.
    pub fn connect(
        &mut self,
        from: NodeId,
        socket: usize,
        to: NodeId,
        plug: usize,
    ) -> ConnectResult<()> {
        let producer = self.get(from)?;
        let offered: &Connector = &producer
            .sockets()
            .get(socket)
            .ok_or(ConnectError::PortNotFound {
                node: from,
                kind: "socket",
                index: socket,
            })?
            .connector;
        let consumer = self.get(to)?;
        let wanted = consumer.plugs().get(plug).ok_or(ConnectError::PortNotFound {
            node: to,
            kind: "plug",
            index: plug,
        })?;
        if wanted.source.is_some() {
            return Err(ConnectError::AlreadyConnected { node: to, plug });
        }
        if !Connector::matches(offered, &wanted.connector) {
            return Err(ConnectError::IncompatibleConnector {
                from,
                socket,
                to,
                plug,
            });
        }
        if from == to || self.downstream_of(to).contains(&from) {
            return Err(ConnectError::WouldCycle { from, to });
        }

        self.get_mut(to)?.plugs_mut()[plug].source = Some((from, socket));
        self.get_mut(from)?.sockets_mut()[socket]
            .targets
            .push((to, plug));
        self.invalidate_from(to);
        debug!(%from, socket, %to, plug, "connected");
        Ok(())
    }

    /// Cuts the edge feeding plug `plug` of `node`.
    pub fn disconnect(&mut self, node: NodeId, plug: usize) -> ConnectResult<()> {
        let consumer = self.get_mut(node)?;
        let p = consumer
            .plugs_mut()
            .get_mut(plug)
            .ok_or(ConnectError::PortNotFound {
                node,
                kind: "plug",
                index: plug,
            })?;
        let Some((src, socket)) = p.source.take() else {
            return Err(ConnectError::Unconnected(format!(
                "{node} plug {plug} is not connected"
            )));
        };
        self.unlink_socket(src, socket, (node, plug));
        self.invalidate_from(node);
        debug!(%node, plug, "disconnected");
        Ok(())
    }

    /// Designates the input node.
    pub fn set_input(&mut self, id: NodeId) -> ConnectResult<()> {
        self.get(id)?;
        self.input = Some(id);
        Ok(())
    }

    /// Designates the output node pulls start from.
    pub fn set_output(&mut self, id: NodeId) -> ConnectResult<()> {
        self.get(id)?;
        self.output = Some(id);
        Ok(())
    }

    /// Input node.
    pub fn input(&self) -> Option<NodeId> {
        self.input
    }

    /// Output node.
    pub fn output(&self) -> Option<NodeId> {
        self.output
    }

    /// Sets an option on a node and invalidates it and everything
    /// downstream of it.
    ///
    /// Requires exclusive access, so no pull can observe a half-applied
    /// change.
    pub fn set_option(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> EngineResult<()> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or_else(|| EngineError::not_found(format!("{id}")))?;
        let key = key.into();
        trace!(node = %id, key = %key, "option set");
        node.options_mut().set(key, value);
        self.invalidate_node(id)?;
        self.invalidate_from(id);
        Ok(())
    }

    /// Text form of [`Conversion::set_option`].
    pub fn set_option_text(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> EngineResult<()> {
        self.set_option(id, key, OptionValue::Text(value.into()))
    }

    /// Options of a node.
    pub fn options(&self, id: NodeId) -> Option<&Options> {
        self.nodes.get(&id).map(FilterNode::options)
    }

    /// Drops a node's context and unpublishes it from the cache.
    ///
    /// Both the key the node was built with and the key its current
    /// streams and options produce are unpublished.
    pub fn invalidate_node(&self, id: NodeId) -> EngineResult<()> {
        let node = self
            .nodes
            .get(&id)
            .ok_or_else(|| EngineError::not_found(format!("{id}")))?;
        let cache = self.engine.cache();
        if let Some(key) = node.invalidate() {
            cache.invalidate(&key);
        }
        if node.filter().needs_context() {
            let mut streams = Streams::new();
            // a node that cannot be described yet has no current key
            if let Ok(resolved) = self.describe(id, &mut streams, Rect::default()) {
                cache.invalidate_for_node(node, &resolved.inputs, &resolved.output);
            }
        }
        Ok(())
    }

    /// Raises the graph-wide dirty flag.
    pub fn mark_dirty(&self) {
        if !self.dirty.swap(true, Ordering::SeqCst) {
            debug!(conversion = self.id, "conversion marked dirty");
        }
    }

    /// Returns `true` if a context went stale or a pull failed since the
    /// flag was last cleared.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Clears the dirty flag, returning its previous value.
    pub fn clear_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }

    /// State of a node.
    pub fn node_state(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(&id).map(FilterNode::state)
    }

    /// Context a node currently holds.
    pub fn node_context(&self, id: NodeId) -> Option<SharedContext> {
        self.nodes.get(&id).and_then(FilterNode::context)
    }

    /// Key of the context a node currently holds.
    pub fn node_key(&self, id: NodeId) -> Option<ContextKey> {
        self.nodes.get(&id).and_then(FilterNode::key)
    }

    /// Checks that an output is set and every mandatory plug is connected.
    pub fn validate(&self) -> ConnectResult<()> {
        if self.output.is_none() {
            return Err(ConnectError::Unconnected("no output node set".into()));
        }
        for node in self.nodes.values() {
            for (i, plug) in node.plugs().iter().enumerate() {
                if plug.connector.mandatory && plug.source.is_none() {
                    return Err(ConnectError::Unconnected(format!(
                        "{} plug {i} is not connected",
                        node.id()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Stream leaving the output node.
    pub fn output_desc(&self) -> EngineResult<StreamDesc> {
        let output = self.output_node()?;
        let mut streams = Streams::new();
        Ok(self.describe(output, &mut streams, Rect::default())?.output)
    }

    /// A ticket for `rect` of the output stream.
    pub fn ticket(&self, rect: Rect) -> EngineResult<PixelAccessTicket> {
        let output = self.output_node()?;
        let desc = self.output_desc()?;
        let image = self
            .nodes
            .get(&output)
            .and_then(|n| n.options().get_image(IMAGE_OPTION))
            .cloned();
        PixelAccessTicket::new(self.id, rect, desc.layout, image)
    }

    /// A ticket for the whole output stream.
    pub fn full_ticket(&self) -> EngineResult<PixelAccessTicket> {
        self.ticket(self.output_desc()?.rect())
    }

    /// Produces the ticket's rectangle into its buffer.
    ///
    /// The rectangle is pulled stripe by stripe when the engine configures
    /// `stripe_rows`; the ticket's cursor advances after each stripe. On
    /// success the result is also written into the ticket's output image.
    /// Any failure aborts the pull, raises the dirty flag and is reported
    /// with the node and rectangle that failed.
    pub fn run_pixels(&self, ticket: &mut PixelAccessTicket) -> EngineResult<()> {
        let result = self.run(ticket);
        if let Err(err) = &result {
            self.mark_dirty();
            if err.is_cancelled() {
                debug!(rows = ticket.cursor(), "pull cancelled");
            } else {
                warn!(error = %err, "pull failed");
            }
        }
        result
    }

    fn output_node(&self) -> EngineResult<NodeId> {
        self.output
            .ok_or_else(|| ConnectError::Unconnected("no output node set".into()).into())
    }

    fn run(&self, ticket: &mut PixelAccessTicket) -> EngineResult<()> {
        if ticket.conversion_id() != self.id {
            return Err(EngineError::incompatible_data(
                "ticket belongs to another conversion",
            ));
        }
        self.validate()?;
        let output = self.output_node()?;
        let rect = ticket.rect();

        let mut streams = Streams::new();
        let desc = self.describe(output, &mut streams, rect)?.output;
        if !desc.rect().contains_rect(&rect) {
            return Err(EngineError::incompatible_data(format!(
                "{rect} is outside the {}x{} output",
                desc.width, desc.height
            ))
            .at(output, rect));
        }
        if ticket.buffer().layout() != desc.layout {
            return Err(EngineError::incompatible_data(format!(
                "ticket buffer is {}, output is {}",
                ticket.buffer().layout(),
                desc.layout
            ))
            .at(output, rect));
        }

        debug!(conversion = self.id, %rect, "run pixels");
        ticket.set_cursor(0);
        for stripe in rect.stripes(self.engine.config().stripe_rows) {
            let local = stripe.relative_to(&rect).ok_or_else(|| {
                EngineError::incompatible_data(format!("{stripe} is outside {rect}"))
            })?;
            let (buffer, cancel) = ticket.parts();
            cancel.check().map_err(|e| e.at(output, stripe))?;
            let view = buffer.view_mut().sub_view(local)?;
            self.pull(output, stripe, view, &streams, cancel)?;
            ticket.set_cursor(stripe.bottom() - rect.y);
        }

        self.write_back(ticket).map_err(|e| e.at(output, rect))
    }

    fn write_back(&self, ticket: &PixelAccessTicket) -> EngineResult<()> {
        let Some(image) = ticket.output_image() else {
            return Ok(());
        };
        let rect = ticket.rect();
        let buffer = ticket.buffer();
        let layout = buffer.layout();
        for row in 0..rect.height {
            let mut line = image.get_line(rect.y + row)?;
            copy_row_span(
                &layout,
                buffer.row(row),
                rect.width,
                0,
                &mut line,
                image.width(),
                rect.x,
                rect.width,
            )?;
            image.set_line(rect.y + row, &line)?;
        }
        trace!(%rect, "written back to output image");
        Ok(())
    }

    /// Describes the streams of `id` and everything upstream of it.
    fn describe(&self, id: NodeId, streams: &mut Streams, rect: Rect) -> EngineResult<Resolved> {
        if let Some(resolved) = streams.get(&id) {
            return Ok(resolved.clone());
        }
        let node = self.get(id)?;
        let mut inputs = Vec::with_capacity(node.plugs().len());
        for (i, plug) in node.plugs().iter().enumerate() {
            let Some((src, _)) = plug.source else {
                if plug.connector.mandatory {
                    return Err(ConnectError::Unconnected(format!(
                        "{id} plug {i} is not connected"
                    ))
                    .into());
                }
                continue;
            };
            let input = self.describe(src, streams, rect)?.output;
            if let Some(reason) = plug.connector.rejection(&input.layout) {
                return Err(
                    EngineError::incompatible_data(format!("plug {i}: {reason}")).at(id, rect)
                );
            }
            inputs.push(input);
        }

        let output = node
            .filter()
            .output_desc(&inputs, node.options())
            .map_err(|e| e.at(id, rect))?;
        let rejected = node
            .sockets()
            .first()
            .and_then(|socket| socket.connector.rejection(&output.layout));
        if let Some(reason) = rejected {
            return Err(EngineError::incompatible_data(format!("socket 0: {reason}")).at(id, rect));
        }

        let resolved = Resolved { inputs, output };
        streams.insert(id, resolved.clone());
        Ok(resolved)
    }

    /// Produces `rect` of node `id` into `out`.
    fn pull(
        &self,
        id: NodeId,
        rect: Rect,
        out: BufferViewMut<'_>,
        streams: &Streams,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        if rect.is_empty() {
            return Ok(());
        }
        let node = self.get(id)?;
        let resolved = streams
            .get(&id)
            .ok_or_else(|| EngineError::not_found(format!("{id} was not described")))?;
        trace!(node = %id, %rect, "pull");
        self.pull_node(node, resolved, rect, out, streams, cancel)
            .map_err(|e| e.at(id, rect))
    }

    fn pull_node(
        &self,
        node: &FilterNode,
        resolved: &Resolved,
        rect: Rect,
        mut out: BufferViewMut<'_>,
        streams: &Streams,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        cancel.check()?;
        let mut stale = false;
        let context = node.ensure_context(
            self.engine.cache(),
            &resolved.inputs,
            &resolved.output,
            &mut stale,
        )?;
        if stale {
            self.mark_dirty();
        }

        let filter = node.filter();
        let upstream: Vec<(usize, NodeId)> = node
            .plugs()
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.source.map(|(src, _)| (i, src)))
            .collect();

        if let [(plug, src)] = upstream[..] {
            let input = &resolved.inputs[0];
            let wanted = filter.upstream_rect(rect, plug, node.options())?;
            if filter.in_place()
                && wanted == rect
                && input.layout == resolved.output.layout
                && input.rect().contains_rect(&rect)
            {
                self.pull(src, rect, out.reborrow(), streams, cancel)?;
                let sources = vec![Source::InPlace {
                    layout: input.layout,
                }];
                return self.execute(node, context, rect, sources, out, cancel);
            }
        }

        let mut buffers = Vec::with_capacity(upstream.len());
        for (n, (plug, src)) in upstream.iter().enumerate() {
            let input = &resolved.inputs[n];
            let wanted = filter.upstream_rect(rect, *plug, node.options())?;
            let clipped = wanted.intersect(&input.rect()).ok_or_else(|| {
                EngineError::incompatible_data(format!(
                    "{wanted} lies outside the {}x{} input",
                    input.width, input.height
                ))
            })?;
            let mut buffer = PixelBuffer::new(clipped.width, clipped.height, input.layout)?;
            self.pull(*src, clipped, buffer.view_mut(), streams, cancel)?;
            buffers.push((buffer, clipped));
        }
        let sources = buffers
            .iter()
            .map(|(buffer, clipped)| Source::Buffer {
                view: buffer.view(),
                rect: *clipped,
            })
            .collect();
        self.execute(node, context, rect, sources, out, cancel)
    }

    fn execute<'a>(
        &self,
        node: &FilterNode,
        context: Option<SharedContext>,
        rect: Rect,
        sources: Vec<Source<'a>>,
        out: BufferViewMut<'a>,
        cancel: &'a CancelToken,
    ) -> EngineResult<()> {
        let mut io = RegionIo::new(rect, sources, out, cancel, self.engine.config());
        node.executing(|| {
            node.filter()
                .execute(context.as_ref(), node.options(), &mut io)
        })
    }

    fn unlink_socket(&mut self, producer: NodeId, socket: usize, target: (NodeId, usize)) {
        if let Some(s) = self
            .nodes
            .get_mut(&producer)
            .and_then(|n| n.sockets_mut().get_mut(socket))
        {
            s.targets.retain(|t| *t != target);
        }
    }

    /// Every node reachable downstream of `id`, excluding `id`.
    fn downstream_of(&self, id: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(&current) {
                for next in node.downstream() {
                    if seen.insert(next) {
                        stack.push(next);
                    }
                }
            }
        }
        seen.remove(&id);
        seen
    }

    /// Invalidates `id` and everything downstream of it, without touching
    /// the cache.
    fn invalidate_from(&self, id: NodeId) {
        let mut affected = self.downstream_of(id);
        affected.insert(id);
        for other in affected {
            if let Some(node) = self.nodes.get(&other) {
                node.invalidate();
            }
        }
    }
}
