//! Message contract shared by the pool launcher and the worker entry shim.
//!
//! One [`PoolInitMessage`] flows launcher → worker, one [`ReadinessSignal`]
//! flows back. Transports that share a channel with unrelated page traffic
//! tag messages with [`INIT_MESSAGE_TYPE`] / [`READY_MESSAGE_TYPE`]; anything
//! else decodes to [`WorkerMessage::Foreign`] and is ignored by both sides.

use std::fmt;

/// Discriminant of the initialization message on multiplexed transports.
pub const INIT_MESSAGE_TYPE: &str = "wasm_bindgen_worker_init";
/// Discriminant of the readiness acknowledgment on multiplexed transports.
pub const READY_MESSAGE_TYPE: &str = "wasm_bindgen_worker_ready";

/// Opaque handle types a backend moves through the bootstrap handshake.
///
/// The protocol never looks inside these; it only clones the shared ones
/// once per worker and moves the per-worker sender into its message.
pub trait HandleSet: 'static {
    type Module: Clone + 'static;
    type Memory: Clone + 'static;
    type TaskReceiver: Clone + 'static;
    type SyncObject: Clone + 'static;
    type ObjectSender: 'static;
}

/// How a worker obtains the compiled module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ModuleSource<M> {
    /// A live module handle travels inside the init message.
    DirectHandle(M),
    /// The worker imports the module itself from this locator.
    LocatorFetch(String),
}

impl<M> ModuleSource<M> {
    pub fn locator(&self) -> Option<&str> {
        match self {
            ModuleSource::DirectHandle(_) => None,
            ModuleSource::LocatorFetch(locator) => Some(locator),
        }
    }

    pub fn is_self_fetching(&self) -> bool {
        matches!(self, ModuleSource::LocatorFetch(_))
    }
}

/// Initialization payload delivered to exactly one worker.
pub struct PoolInitMessage<H: HandleSet> {
    pub module: ModuleSource<H::Module>,
    pub memory: H::Memory,
    pub task_receiver: H::TaskReceiver,
    pub sync_object: H::SyncObject,
    pub object_sender: H::ObjectSender,
}

impl<H: HandleSet> fmt::Debug for PoolInitMessage<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolInitMessage")
            .field("self_fetching", &self.module.is_self_fetching())
            .finish_non_exhaustive()
    }
}

/// Fields common to every worker's init message.
pub struct SharedInit<H: HandleSet> {
    pub module: ModuleSource<H::Module>,
    pub memory: H::Memory,
    pub task_receiver: H::TaskReceiver,
    pub sync_object: H::SyncObject,
}

impl<H: HandleSet> SharedInit<H> {
    /// Builds the message for one worker. The shared part is cloned, so the
    /// returned message is independent of every other worker's.
    pub fn for_worker(&self, object_sender: H::ObjectSender) -> PoolInitMessage<H> {
        PoolInitMessage {
            module: self.module.clone(),
            memory: self.memory.clone(),
            task_receiver: self.task_receiver.clone(),
            sync_object: self.sync_object.clone(),
            object_sender,
        }
    }
}

/// Content-free acknowledgment that a worker finished instantiation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessSignal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Init,
    Ready,
    Foreign,
}

impl MessageKind {
    /// Maps a transport `type` tag to a kind. Unknown or missing tags are foreign.
    pub fn from_type_tag(tag: Option<&str>) -> Self {
        match tag {
            Some(INIT_MESSAGE_TYPE) => MessageKind::Init,
            Some(READY_MESSAGE_TYPE) => MessageKind::Ready,
            _ => MessageKind::Foreign,
        }
    }

    pub fn type_tag(self) -> Option<&'static str> {
        match self {
            MessageKind::Init => Some(INIT_MESSAGE_TYPE),
            MessageKind::Ready => Some(READY_MESSAGE_TYPE),
            MessageKind::Foreign => None,
        }
    }
}

/// Anything that can arrive on a worker's message channel.
pub enum WorkerMessage<H: HandleSet> {
    Init(PoolInitMessage<H>),
    Ready(ReadinessSignal),
    /// Unrelated traffic, kept only by its tag for diagnostics.
    Foreign(String),
}

impl<H: HandleSet> WorkerMessage<H> {
    pub fn kind(&self) -> MessageKind {
        match self {
            WorkerMessage::Init(_) => MessageKind::Init,
            WorkerMessage::Ready(_) => MessageKind::Ready,
            WorkerMessage::Foreign(_) => MessageKind::Foreign,
        }
    }

    pub fn is_init(&self) -> bool {
        self.kind() == MessageKind::Init
    }

    pub fn is_ready(&self) -> bool {
        self.kind() == MessageKind::Ready
    }

    pub fn into_init(self) -> Option<PoolInitMessage<H>> {
        match self {
            WorkerMessage::Init(init) => Some(init),
            _ => None,
        }
    }
}

impl<H: HandleSet> fmt::Debug for WorkerMessage<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerMessage::Init(init) => f.debug_tuple("Init").field(init).finish(),
            WorkerMessage::Ready(signal) => f.debug_tuple("Ready").field(signal).finish(),
            WorkerMessage::Foreign(tag) => f.debug_tuple("Foreign").field(tag).finish(),
        }
    }
}
