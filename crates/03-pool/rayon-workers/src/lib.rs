//! Builds `rayon` thread pools whose threads run inside bootstrapped workers.
//!
//! [`WorkersBuilder::build`] starts the workers and leaves each of them
//! blocked on a shared task queue. [`PoolBuildable`] then plugs that queue
//! into `rayon::ThreadPoolBuilder::spawn_handler`, so every rayon thread's
//! main loop is received and run by one worker.

use std::fmt;
use std::future::Future;
use std::io;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError};
use log::debug;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use worker_bootstrap::{
    start_workers, start_workers_with_deadline, BootstrapConfig, BootstrapError,
    BootstrapResult, Job, ModuleSource, Platform, Pool, PoolRequest, TaskChannels,
};

/// Receiving end of one worker's object channel.
#[derive(Debug)]
pub struct WorkerReceiver<T> {
    receiver: Receiver<T>,
}

impl<T> WorkerReceiver<T> {
    fn new(receiver: Receiver<T>) -> Self {
        Self { receiver }
    }

    /// Blocks until the worker delivers its object.
    pub fn recv(&self) -> Result<T, RecvError> {
        self.receiver.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Sets up the channels a worker pool needs and starts it.
pub struct WorkersBuilder<H: TaskChannels> {
    share: H::SyncObject,
    num_workers: usize,
    sender: Option<Sender<Job>>,
    obj_receivers: Vec<WorkerReceiver<H::Delivery>>,
}

impl<H: TaskChannels> WorkersBuilder<H> {
    /// One worker sharing `share`.
    pub fn new(share: H::SyncObject) -> Self {
        Self {
            share,
            num_workers: 1,
            sender: None,
            obj_receivers: Vec::new(),
        }
    }

    /// Builder sized by a validated configuration.
    pub fn from_config(config: &BootstrapConfig, share: H::SyncObject) -> BootstrapResult<Self> {
        config.validate()?;
        Ok(Self::new(share).num_workers(config.num_workers))
    }

    /// Sets how many workers to start. Zero is rejected by [`Self::build`].
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Object handed to every worker.
    pub fn share(mut self, share: H::SyncObject) -> Self {
        self.share = share;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.num_workers
    }

    /// Per-worker object channels, indexed like the pool. Empty before
    /// [`Self::build`].
    pub fn receivers(&self) -> &[WorkerReceiver<H::Delivery>] {
        &self.obj_receivers
    }

    pub fn take_receivers(&mut self) -> Vec<WorkerReceiver<H::Delivery>> {
        std::mem::take(&mut self.obj_receivers)
    }

    /// Starts the workers and resolves once every one of them is ready.
    pub async fn build<P>(
        &mut self,
        platform: &P,
        source: ModuleSource<H::Module>,
        memory: H::Memory,
    ) -> BootstrapResult<Pool<P::Worker>>
    where
        P: Platform<Handles = H>,
    {
        let request = self.prepare(source, memory)?;
        start_workers(platform, request).await
    }

    /// [`Self::build`], failing with `WorkerBootstrapTimeout` when `deadline`
    /// fires before the pool is ready.
    pub async fn build_with_deadline<P, D>(
        &mut self,
        platform: &P,
        source: ModuleSource<H::Module>,
        memory: H::Memory,
        deadline: D,
    ) -> BootstrapResult<Pool<P::Worker>>
    where
        P: Platform<Handles = H>,
        D: Future<Output = ()>,
    {
        let request = self.prepare(source, memory)?;
        start_workers_with_deadline(platform, request, deadline).await
    }

    fn prepare(
        &mut self,
        source: ModuleSource<H::Module>,
        memory: H::Memory,
    ) -> BootstrapResult<PoolRequest<H>> {
        if self.num_workers == 0 {
            return Err(BootstrapError::InvalidConfig("num_workers must be at least 1"));
        }
        let (sender, receiver) = bounded(self.num_workers);

        self.obj_receivers.clear();
        let mut object_senders = Vec::with_capacity(self.num_workers);
        for _ in 0..self.num_workers {
            let (obj_sender, obj_receiver) = bounded(1);
            object_senders.push(H::object_sender(&obj_sender));
            self.obj_receivers.push(WorkerReceiver::new(obj_receiver));
        }

        self.sender = Some(sender);
        debug!("starting {} worker(s)", self.num_workers);
        Ok(PoolRequest {
            source,
            memory,
            length: self.num_workers,
            task_receiver: H::task_receiver(&receiver),
            sync_object: self.share.clone(),
            object_senders,
        })
    }

    fn spawn_handler(&self) -> impl FnMut(rayon::ThreadBuilder) -> io::Result<()> {
        let sender = self.sender.clone();
        move |thread| {
            let sender = sender.as_ref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotConnected, "workers have not been built")
            })?;
            sender
                .send(Box::new(move || thread.run()))
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "task queue closed"))
        }
    }
}

/// `rayon::ThreadPoolBuilder` extension that runs pool threads on workers.
pub trait PoolBuildable {
    fn build_on_workers<H: TaskChannels>(
        self,
        builder: &WorkersBuilder<H>,
    ) -> Result<ThreadPool, ThreadPoolBuildError>;

    fn build_on_workers_global<H: TaskChannels>(
        self,
        builder: &WorkersBuilder<H>,
    ) -> Result<(), ThreadPoolBuildError>;
}

impl PoolBuildable for ThreadPoolBuilder {
    fn build_on_workers<H: TaskChannels>(
        self,
        builder: &WorkersBuilder<H>,
    ) -> Result<ThreadPool, ThreadPoolBuildError> {
        self.num_threads(builder.num_workers)
            .spawn_handler(builder.spawn_handler())
            .build()
    }

    fn build_on_workers_global<H: TaskChannels>(
        self,
        builder: &WorkersBuilder<H>,
    ) -> Result<(), ThreadPoolBuildError> {
        self.num_threads(builder.num_workers)
            .spawn_handler(builder.spawn_handler())
            .build_global()
    }
}

impl<H> fmt::Debug for WorkersBuilder<H>
where
    H: TaskChannels,
    H::SyncObject: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkersBuilder")
            .field("share", &self.share)
            .field("num_workers", &self.num_workers)
            .field("built", &self.sender.is_some())
            .finish()
    }
}
