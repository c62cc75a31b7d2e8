//! Graph nodes and their run state machine.
//!
//! ```text
//! Unbuilt --pull--> Building --ok--> Ready <--> Executing
//!    ^                 |               |
//!    +------err--------+               | option change / disconnect
//!    ^                                 v
//!    +-----------next pull------- Invalidated
//! ```
//!
//! `Executing` is not stored: a node is executing while its execution
//! counter is non-zero. Only context construction is serialized (by the
//! cache); executions of reentrant filters run concurrently.

use crate::cache::ContextCache;
use crate::filter::{Filter, SharedContext, StreamDesc};
use crate::key::ContextKey;
use colorflow_core::{Connector, EngineResult, NodeId, Options};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Observable state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeState {
    /// No context; the next pull builds one.
    Unbuilt,
    /// A pull is building the context.
    Building,
    /// The context is built.
    Ready,
    /// At least one pull is executing over the context.
    Executing,
    /// The context is stale and is dropped by the next pull.
    Invalidated,
}

/// An input port and the socket feeding it.
#[derive(Debug, Clone)]
pub struct Plug {
    /// Capabilities.
    pub connector: Connector,
    /// `(producer, socket index)` once connected.
    pub source: Option<(NodeId, usize)>,
}

/// An output port and the plugs it feeds.
#[derive(Debug, Clone)]
pub struct Socket {
    /// Capabilities.
    pub connector: Connector,
    /// `(consumer, plug index)` of every connected plug.
    pub targets: Vec<(NodeId, usize)>,
}

#[derive(Debug)]
struct Runtime {
    state: NodeState,
    key: Option<ContextKey>,
    context: Option<SharedContext>,
}

/// A filter instance inside a conversion.
///
/// Neighbors are referenced by id; the conversion owns every node.
#[derive(Debug)]
pub struct FilterNode {
    id: NodeId,
    filter: Arc<dyn Filter>,
    options: Options,
    plugs: Vec<Plug>,
    sockets: Vec<Socket>,
    runtime: Mutex<Runtime>,
    executing: AtomicUsize,
    exclusive: Mutex<()>,
}

impl FilterNode {
    pub(crate) fn new(id: NodeId, filter: Arc<dyn Filter>, options: Options) -> Self {
        let plugs = filter
            .plugs()
            .into_iter()
            .map(|connector| Plug {
                connector,
                source: None,
            })
            .collect();
        let sockets = filter
            .sockets()
            .into_iter()
            .map(|connector| Socket {
                connector,
                targets: Vec::new(),
            })
            .collect();
        Self {
            id,
            filter,
            options,
            plugs,
            sockets,
            runtime: Mutex::new(Runtime {
                state: NodeState::Unbuilt,
                key: None,
                context: None,
            }),
            executing: AtomicUsize::new(0),
            exclusive: Mutex::new(()),
        }
    }

    /// Node id.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The filter implementation.
    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    /// Registration string of the filter.
    pub fn registration(&self) -> &str {
        self.filter.registration()
    }

    /// Current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    pub(crate) fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Input ports.
    pub fn plugs(&self) -> &[Plug] {
        &self.plugs
    }

    pub(crate) fn plugs_mut(&mut self) -> &mut [Plug] {
        &mut self.plugs
    }

    /// Output ports.
    pub fn sockets(&self) -> &[Socket] {
        &self.sockets
    }

    pub(crate) fn sockets_mut(&mut self) -> &mut [Socket] {
        &mut self.sockets
    }

    /// Nodes feeding this node's plugs, in plug order.
    pub fn upstream(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.plugs.iter().filter_map(|p| p.source.map(|(id, _)| id))
    }

    /// Nodes fed by this node's sockets.
    pub fn downstream(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.sockets
            .iter()
            .flat_map(|s| s.targets.iter().map(|(id, _)| *id))
    }

    fn runtime(&self) -> MutexGuard<'_, Runtime> {
        self.runtime.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state.
    pub fn state(&self) -> NodeState {
        let state = self.runtime().state;
        if state == NodeState::Ready && self.executing.load(Ordering::SeqCst) > 0 {
            NodeState::Executing
        } else {
            state
        }
    }

    /// Key of the context the node currently holds.
    pub fn key(&self) -> Option<ContextKey> {
        self.runtime().key
    }

    /// Context the node currently holds.
    pub fn context(&self) -> Option<SharedContext> {
        self.runtime().context.clone()
    }

    /// Key for the given streams and the node's current options.
    pub fn context_key(&self, inputs: &[StreamDesc], output: &StreamDesc) -> ContextKey {
        ContextKey::for_node(self.filter.as_ref(), inputs, output, &self.options)
    }

    /// Marks the context stale. Returns the key it was built for.
    ///
    /// The node stops referencing the context; executions already holding
    /// it keep it alive.
    pub(crate) fn invalidate(&self) -> Option<ContextKey> {
        let mut rt = self.runtime();
        let key = rt.key;
        if rt.state != NodeState::Unbuilt {
            rt.state = NodeState::Invalidated;
            rt.context = None;
            debug!(node = %self.id, "node invalidated");
        }
        key
    }

    /// Makes sure the node holds the context for the given streams.
    ///
    /// Returns `Ok(None)` for filters without a context. `stale` is set
    /// when a ready context had to be replaced because its key changed.
    pub(crate) fn ensure_context(
        &self,
        cache: &ContextCache,
        inputs: &[StreamDesc],
        output: &StreamDesc,
        stale: &mut bool,
    ) -> EngineResult<Option<SharedContext>> {
        let key = self
            .filter
            .needs_context()
            .then(|| self.context_key(inputs, output));
        {
            let mut rt = self.runtime();
            match rt.state {
                NodeState::Ready | NodeState::Executing if rt.key == key => {
                    return Ok(rt.context.clone());
                }
                NodeState::Ready | NodeState::Executing => {
                    debug!(node = %self.id, "context key changed, rebuilding");
                    *stale = true;
                }
                NodeState::Invalidated => {
                    trace!(node = %self.id, "dropping invalidated context");
                }
                NodeState::Unbuilt | NodeState::Building => {}
            }
            rt.state = NodeState::Building;
            rt.context = None;
        }

        let result = match key {
            Some(key) => cache
                .get_or_build(key, || self.filter.build_context(inputs, output, &self.options))
                .map(Some),
            None => Ok(None),
        };

        let mut rt = self.runtime();
        match result {
            Ok(context) => {
                rt.state = NodeState::Ready;
                rt.key = key;
                rt.context = context.clone();
                trace!(node = %self.id, "node ready");
                Ok(context)
            }
            Err(err) => {
                rt.state = NodeState::Unbuilt;
                rt.key = None;
                Err(err)
            }
        }
    }

    /// Runs `f` in the `Executing` state.
    ///
    /// Non-reentrant filters are serialized per node.
    pub(crate) fn executing<R>(&self, f: impl FnOnce() -> R) -> R {
        let _exclusive = (!self.filter.reentrant())
            .then(|| self.exclusive.lock().unwrap_or_else(PoisonError::into_inner));
        self.executing.fetch_add(1, Ordering::SeqCst);
        let _guard = ExecGuard(&self.executing);
        f()
    }
}

struct ExecGuard<'a>(&'a AtomicUsize);

impl Drop for ExecGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
