use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use futures::channel::mpsc;
use parking_lot::RwLock;
use worker_bootstrap::{BootstrapResult, HandleSet, Job, TaskChannels, WorkerMessage};

pub(crate) type Outbox = mpsc::UnboundedSender<WorkerMessage<NativeHandles>>;

/// Handle types used by native worker threads.
#[derive(Debug)]
pub struct NativeHandles;

impl HandleSet for NativeHandles {
    type Module = NativeModule;
    type Memory = SharedMemory;
    type TaskReceiver = Receiver<Job>;
    type SyncObject = ShareObject;
    type ObjectSender = Sender<ObjectDelivery>;
}

impl TaskChannels for NativeHandles {
    type Delivery = ObjectDelivery;

    fn task_receiver(receiver: &Receiver<Job>) -> Receiver<Job> {
        receiver.clone()
    }

    fn object_sender(sender: &Sender<ObjectDelivery>) -> Sender<ObjectDelivery> {
        sender.clone()
    }
}

/// Linear memory segment shared by the launcher and every worker.
#[derive(Clone, Debug)]
pub struct SharedMemory(Arc<RwLock<Vec<u8>>>);

impl SharedMemory {
    /// Allocates a zeroed segment of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self(Arc::new(RwLock::new(vec![0; len])))
    }

    /// Size of the segment in bytes.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Returns `true` for a zero-sized segment.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies `bytes` in at `offset`. Returns `false` when out of bounds.
    pub fn store(&self, offset: usize, bytes: &[u8]) -> bool {
        let mut segment = self.0.write();
        match offset.checked_add(bytes.len()) {
            Some(end) if end <= segment.len() => {
                segment[offset..end].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    /// Copies `len` bytes out from `offset`.
    pub fn load(&self, offset: usize, len: usize) -> Option<Vec<u8>> {
        let segment = self.0.read();
        let end = offset.checked_add(len)?;
        segment.get(offset..end).map(<[u8]>::to_vec)
    }

    /// Whether both handles refer to the same segment.
    pub fn same_segment(&self, other: &SharedMemory) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

type InitHook = dyn Fn(&InitContext<'_>) -> BootstrapResult<()> + Send + Sync;

/// Compiled module image. Instantiating it runs its init hook inside the
/// worker thread.
#[derive(Clone)]
pub struct NativeModule {
    name: Arc<str>,
    init: Arc<InitHook>,
}

impl NativeModule {
    /// Module whose instantiation runs `init`.
    pub fn new<F>(name: &str, init: F) -> Self
    where
        F: Fn(&InitContext<'_>) -> BootstrapResult<()> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            init: Arc::new(init),
        }
    }

    /// Module with nothing to initialize.
    pub fn inert(name: &str) -> Self {
        Self::new(name, |_| Ok(()))
    }

    /// Name given at construction.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn instantiate(&self, cx: &InitContext<'_>) -> BootstrapResult<()> {
        (self.init)(cx)
    }
}

impl fmt::Debug for NativeModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeModule")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// What a module's init hook sees while a worker instantiates it.
pub struct InitContext<'a> {
    pub(crate) worker_index: usize,
    pub(crate) memory: &'a SharedMemory,
    pub(crate) outbox: &'a Outbox,
}

impl InitContext<'_> {
    /// Index of the instantiating worker.
    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// The pool's shared memory.
    pub fn memory(&self) -> &SharedMemory {
        self.memory
    }

    /// Sends unrelated traffic to the launcher; it must not count as readiness.
    pub fn announce(&self, tag: &str) {
        let _ = self
            .outbox
            .unbounded_send(WorkerMessage::Foreign(tag.to_owned()));
    }
}

/// Opaque object shared with every worker of a pool.
#[derive(Clone)]
pub struct ShareObject(Arc<dyn Any + Send + Sync>);

impl ShareObject {
    /// Wraps `value`.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrows the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }

    /// Whether both handles wrap the same allocation.
    pub fn ptr_eq(&self, other: &ShareObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ShareObject {
    fn default() -> Self {
        Self::new(())
    }
}

impl fmt::Debug for ShareObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareObject(..)")
    }
}

/// Pushed by a worker through its object sender when its loop starts.
#[derive(Clone, Debug)]
pub struct ObjectDelivery {
    /// Index of the worker that made the delivery.
    pub worker_index: usize,
    /// The pool's shared object.
    pub object: ShareObject,
}
