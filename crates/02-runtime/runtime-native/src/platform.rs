use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use futures::channel::mpsc;
use futures::executor::block_on;
use log::{debug, error};
use parking_lot::Mutex;
use worker_bootstrap::{
    enter_worker_loop, BootstrapError, BootstrapResult, Job, ModuleSource, Platform,
    ReadinessSignal, WorkerEntry, WorkerHost, WorkerMessage, WorkerShim,
};

use crate::handles::{
    InitContext, NativeHandles, NativeModule, ObjectDelivery, Outbox, ShareObject, SharedMemory,
};
use crate::registry::{ModuleRegistry, ScriptBlob, ScriptStore};

/// Messages a native worker sends back to its launcher.
pub type NativeInbox = mpsc::UnboundedReceiver<WorkerMessage<NativeHandles>>;

/// Spawns workers as named OS threads.
#[derive(Clone, Debug, Default)]
pub struct NativePlatform {
    modules: ModuleRegistry,
    scripts: ScriptStore,
    own_script: Option<ScriptBlob>,
}

impl NativePlatform {
    /// Platform with an empty module registry and no self-fetchable script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `modules` to resolve locators inside workers.
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = modules;
        self
    }

    /// Script returned when the launcher fetches its own source.
    pub fn with_own_script(mut self, script: ScriptBlob) -> Self {
        self.own_script = Some(script);
        self
    }

    /// Locator table shared with the workers.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Object URLs created for self-fetched scripts.
    pub fn scripts(&self) -> &ScriptStore {
        &self.scripts
    }
}

impl Platform for NativePlatform {
    type Handles = NativeHandles;
    type Worker = NativeWorker;
    type Inbox = NativeInbox;
    type Script = ScriptBlob;

    fn spawn(&self, index: usize, entry: WorkerEntry<'_>) -> BootstrapResult<NativeWorker> {
        if let WorkerEntry::ScriptUrl(url) = entry {
            if self.scripts.resolve(url).is_none() {
                return Err(BootstrapError::spawn(
                    index,
                    format!("script url {url} is not live"),
                ));
            }
        }

        let (to_worker, worker_inbox) = mpsc::unbounded();
        let (outbox, from_worker) = mpsc::unbounded();
        let host = NativeHost {
            index,
            outbox,
            modules: self.modules.clone(),
        };

        let name = format!("pool-worker-{index}");
        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || host.run(worker_inbox))
            .map_err(|err| BootstrapError::spawn(index, err.to_string()))?;
        debug!("spawned {name}");

        Ok(NativeWorker {
            index,
            name,
            to_worker,
            from_worker: Mutex::new(Some(from_worker)),
            thread: Mutex::new(Some(thread)),
        })
    }

    fn listen(&self, worker: &NativeWorker) -> BootstrapResult<NativeInbox> {
        worker
            .from_worker
            .lock()
            .take()
            .ok_or(BootstrapError::ChannelClosed)
    }

    fn post(
        &self,
        worker: &NativeWorker,
        message: WorkerMessage<NativeHandles>,
    ) -> BootstrapResult<()> {
        worker
            .to_worker
            .unbounded_send(message)
            .map_err(|err| BootstrapError::post(worker.index, err.to_string()))
    }

    async fn fetch_own_script(&self) -> BootstrapResult<ScriptBlob> {
        self.own_script
            .clone()
            .ok_or_else(|| BootstrapError::script_fetch("no launcher script registered"))
    }

    fn create_script_url(&self, script: &ScriptBlob) -> BootstrapResult<String> {
        Ok(self.scripts.create(script))
    }

    fn revoke_script_url(&self, url: &str) {
        if self.scripts.revoke(url) {
            debug!("revoked {url}");
        }
    }
}

/// A worker thread owned by the launcher's caller.
#[derive(Debug)]
pub struct NativeWorker {
    index: usize,
    name: String,
    to_worker: mpsc::UnboundedSender<WorkerMessage<NativeHandles>>,
    from_worker: Mutex<Option<NativeInbox>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl NativeWorker {
    /// Position of the worker in its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// OS thread name, `pool-worker-<index>`.
    pub fn thread_name(&self) -> &str {
        &self.name
    }

    /// Posts unrelated traffic to the worker, as a page sharing its channel would.
    pub fn post_foreign(&self, tag: &str) -> BootstrapResult<()> {
        self.to_worker
            .unbounded_send(WorkerMessage::Foreign(tag.to_owned()))
            .map_err(|err| BootstrapError::post(self.index, err.to_string()))
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the worker thread to exit. Returns `false` if it panicked.
    pub fn join(&self) -> bool {
        match self.thread.lock().take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

struct NativeInstance {
    module: NativeModule,
    memory: SharedMemory,
}

/// Worker-side services backing the shim on a native thread.
struct NativeHost {
    index: usize,
    outbox: Outbox,
    modules: ModuleRegistry,
}

impl NativeHost {
    fn run(self, inbox: mpsc::UnboundedReceiver<WorkerMessage<NativeHandles>>) {
        let mut shim = WorkerShim::new(&self);
        if let Err(err) = block_on(shim.run(inbox)) {
            error!(
                "worker {} stopped in state {:?}: {err}",
                self.index,
                shim.state()
            );
        }
    }
}

impl WorkerHost for NativeHost {
    type Handles = NativeHandles;
    type Instance = NativeInstance;

    async fn instantiate(
        &self,
        module: ModuleSource<NativeModule>,
        memory: SharedMemory,
    ) -> BootstrapResult<NativeInstance> {
        let module = match module {
            ModuleSource::DirectHandle(module) => module,
            ModuleSource::LocatorFetch(locator) => self.modules.resolve(&locator)?,
        };
        module.instantiate(&InitContext {
            worker_index: self.index,
            memory: &memory,
            outbox: &self.outbox,
        })?;
        Ok(NativeInstance { module, memory })
    }

    fn signal_ready(&self, signal: ReadinessSignal) -> BootstrapResult<()> {
        self.outbox
            .unbounded_send(WorkerMessage::Ready(signal))
            .map_err(|_| BootstrapError::ChannelClosed)
    }

    fn run_worker_loop(
        &self,
        instance: NativeInstance,
        task_receiver: Receiver<Job>,
        sync_object: ShareObject,
        object_sender: Sender<ObjectDelivery>,
    ) {
        debug!(
            "worker {} running {} over {} bytes",
            self.index,
            instance.module.name(),
            instance.memory.len()
        );
        let delivery = ObjectDelivery {
            worker_index: self.index,
            object: sync_object,
        };
        enter_worker_loop(&task_receiver, &object_sender, delivery);
    }
}
